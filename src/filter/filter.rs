use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::FilterError;
use super::filter_order::{FilterOrder, Ordering};
use super::filter_where::{FilterWhere, Predicate};
use super::page::{clamp_page, PageBounds, PageSpec};
use super::types::{FilterSpec, SortDirection, SortSpec, SqlParam, SqlResult};

/// Typed list request for one entity, as handed over by the request layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: FilterSpec,
    #[serde(default)]
    pub sort: SortSpec,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Also count the owner-scoped, filtered set
    #[serde(default)]
    pub with_total: bool,
}

/// Raw list query-string parameters: `?limit=&offset=&sort=&order=&filter=&total=`.
/// `filter` carries a JSON object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub filter: Option<String>,
    pub total: Option<bool>,
}

impl TryFrom<ListParams> for ListQuery {
    type Error = FilterError;

    fn try_from(params: ListParams) -> Result<Self, Self::Error> {
        let filter = match params.filter.as_deref().map(str::trim) {
            None | Some("") => FilterSpec::new(),
            Some(raw) => match serde_json::from_str::<Value>(raw)? {
                Value::Object(map) => map.into_iter().collect(),
                _ => return Err(FilterError::InvalidFilter("filter must be a JSON object".to_string())),
            },
        };

        Ok(ListQuery {
            filter,
            sort: SortSpec {
                field: params.sort,
                direction: params.order.as_deref().and_then(SortDirection::parse),
            },
            limit: params.limit,
            offset: params.offset,
            with_total: params.total.unwrap_or(false),
        })
    }
}

/// A resolved read: owner-scoped predicate, total ordering and page window.
#[derive(Debug, Clone)]
pub struct Filter {
    predicate: Predicate,
    ordering: Ordering,
    page: Option<PageSpec>,
}

impl Filter {
    pub fn new(predicate: Predicate, ordering: Ordering, page: Option<PageSpec>) -> Self {
        Self { predicate, ordering, page }
    }

    /// Compose the predicate, sort and pagination builders for one request
    pub fn from_list_query(
        schema: &'static crate::schema::EntitySchema,
        query: &ListQuery,
        owner: Uuid,
        bounds: &PageBounds,
    ) -> Self {
        Self {
            predicate: FilterWhere::build(schema, &query.filter, owner),
            ordering: FilterOrder::build(schema, &query.sort),
            page: Some(clamp_page(query.limit, query.offset, bounds)),
        }
    }

    pub fn to_sql(&self) -> SqlResult {
        let schema = self.predicate.schema();
        let mut params: Vec<SqlParam> = vec![];
        let where_clause = self.predicate.to_sql(&mut params);

        let query = [
            "SELECT *".to_string(),
            format!("FROM {}", schema.quoted_table()),
            format!("WHERE {}", where_clause),
            self.ordering.to_sql(),
            self.page.map(|p| p.to_sql()).unwrap_or_default(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let schema = self.predicate.schema();
        let mut params: Vec<SqlParam> = vec![];
        let where_clause = self.predicate.to_sql(&mut params);
        let query = format!(
            "SELECT COUNT(*) AS count FROM {} WHERE {}",
            schema.quoted_table(),
            where_clause
        );
        SqlResult { query, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, DefaultSort, EntitySchema};

    static TAGS: EntitySchema = EntitySchema {
        table: "tags",
        id_field: "id",
        owner_field: "user_id",
        columns: &[
            Column::uuid("id"),
            Column::uuid("user_id"),
            Column::text("label"),
            Column::timestamp("created_at"),
        ],
        filterable: &["label"],
        sortable: &["id", "created_at"],
        default_sort: DefaultSort { field: "id", direction: SortDirection::Asc },
        created_field: Some("created_at"),
        updated_field: None,
    };

    #[test]
    fn composes_full_select() {
        let query = ListQuery {
            filter: serde_json::from_value(serde_json::json!({ "label": "red", "nope": 1 })).unwrap(),
            sort: SortSpec::new("created_at", SortDirection::Desc),
            limit: Some(500),
            offset: Some(40),
            with_total: false,
        };
        let filter = Filter::from_list_query(&TAGS, &query, Uuid::new_v4(), &PageBounds::default());
        let sql = filter.to_sql();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"tags\" WHERE \"user_id\" = $1 AND \"label\" = $2 \
             ORDER BY \"created_at\" DESC, \"id\" ASC LIMIT 100 OFFSET 40"
        );
        assert_eq!(sql.params.len(), 2);

        let count = filter.to_count_sql();
        assert_eq!(
            count.query,
            "SELECT COUNT(*) AS count FROM \"tags\" WHERE \"user_id\" = $1 AND \"label\" = $2"
        );
    }

    #[test]
    fn parses_raw_params() {
        let params = ListParams {
            limit: Some(5),
            sort: Some("created_at".into()),
            order: Some("DESC".into()),
            filter: Some(r#"{"label":"red"}"#.into()),
            total: Some(true),
            ..Default::default()
        };
        let query = ListQuery::try_from(params).unwrap();
        assert_eq!(query.sort, SortSpec::new("created_at", SortDirection::Desc));
        assert_eq!(query.filter.get("label"), Some(&serde_json::json!("red")));
        assert!(query.with_total);
    }

    #[test]
    fn rejects_non_object_filter() {
        let params = ListParams { filter: Some("[1,2]".into()), ..Default::default() };
        assert!(matches!(ListQuery::try_from(params), Err(FilterError::InvalidFilter(_))));

        let params = ListParams { filter: Some("{oops".into()), ..Default::default() };
        assert!(matches!(ListQuery::try_from(params), Err(FilterError::JsonError(_))));
    }
}
