use serde_json::{Map, Value};
use std::cmp::Ordering as CmpOrdering;

use super::filter_where::stored_value;
use super::types::{SortDirection, SortSpec};
use crate::schema::{Column, EntitySchema};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderKey {
    pub column: Column,
    pub direction: SortDirection,
}

/// Resolved ORDER BY clause. The last key is always the entity id, so any two
/// distinct rows have a defined relative order and offset pages never overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    keys: Vec<OrderKey>,
}

impl Ordering {
    pub fn to_sql(&self) -> String {
        let parts: Vec<String> = self
            .keys
            .iter()
            .map(|k| format!("{} {}", k.column.quoted(), k.direction.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// Compare two JSON rows the way Postgres orders them (NULLS LAST for
    /// ascending keys, NULLS FIRST for descending ones).
    pub fn compare(&self, a: &Map<String, Value>, b: &Map<String, Value>) -> CmpOrdering {
        for key in &self.keys {
            let left = stored_value(a, key.column);
            let right = stored_value(b, key.column);
            let ordering = match (left.is_null(), right.is_null()) {
                (true, true) => CmpOrdering::Equal,
                (true, false) => CmpOrdering::Greater,
                (false, true) => CmpOrdering::Less,
                (false, false) => left.compare(&right).unwrap_or(CmpOrdering::Equal),
            };
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != CmpOrdering::Equal {
                return ordering;
            }
        }
        CmpOrdering::Equal
    }
}

/// Sort builder: resolves a client [`SortSpec`] against the sort whitelist.
pub struct FilterOrder;

impl FilterOrder {
    pub fn build(schema: &'static EntitySchema, sort: &SortSpec) -> Ordering {
        let requested = sort
            .field
            .as_deref()
            .and_then(|field| schema.sortable_column(field).map(|column| (field, column)));

        let primary = match requested {
            Some((_, column)) => OrderKey {
                column: *column,
                direction: sort.direction.unwrap_or_default(),
            },
            None => {
                if let Some(field) = sort.field.as_deref() {
                    tracing::debug!("Sort key {}.{} not whitelisted, using default", schema.table, field);
                }
                Self::default_key(schema)
            }
        };

        let mut keys = vec![primary];
        if primary.column.name != schema.id_field {
            keys.push(OrderKey { column: schema.id_column(), direction: SortDirection::Asc });
        }
        Ordering { keys }
    }

    fn default_key(schema: &'static EntitySchema) -> OrderKey {
        let column = schema
            .sortable_column(schema.default_sort.field)
            .copied()
            .unwrap_or_else(|| schema.id_column());
        OrderKey { column, direction: schema.default_sort.direction }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DefaultSort;
    use serde_json::json;

    static POSTS: EntitySchema = EntitySchema {
        table: "posts",
        id_field: "id",
        owner_field: "user_id",
        columns: &[
            Column::uuid("id"),
            Column::uuid("user_id"),
            Column::text("body"),
            Column::integer("votes"),
            Column::timestamp("created_at"),
        ],
        filterable: &["id"],
        sortable: &["id", "votes", "created_at"],
        default_sort: DefaultSort { field: "created_at", direction: SortDirection::Desc },
        created_field: Some("created_at"),
        updated_field: None,
    };

    #[test]
    fn whitelisted_key_gets_id_tie_break() {
        let ordering = FilterOrder::build(&POSTS, &SortSpec::new("votes", SortDirection::Desc));
        assert_eq!(ordering.to_sql(), "ORDER BY \"votes\" DESC, \"id\" ASC");
    }

    #[test]
    fn id_sort_needs_no_tie_break() {
        let ordering = FilterOrder::build(&POSTS, &SortSpec::new("id", SortDirection::Desc));
        assert_eq!(ordering.to_sql(), "ORDER BY \"id\" DESC");
    }

    #[test]
    fn unknown_or_missing_key_falls_back_to_default() {
        let ordering = FilterOrder::build(&POSTS, &SortSpec::new("body", SortDirection::Asc));
        assert_eq!(ordering.to_sql(), "ORDER BY \"created_at\" DESC, \"id\" ASC");

        let ordering = FilterOrder::build(&POSTS, &SortSpec::default());
        assert_eq!(ordering.to_sql(), "ORDER BY \"created_at\" DESC, \"id\" ASC");
    }

    #[test]
    fn missing_direction_is_ascending() {
        let sort = SortSpec { field: Some("votes".into()), direction: None };
        let ordering = FilterOrder::build(&POSTS, &sort);
        assert_eq!(ordering.to_sql(), "ORDER BY \"votes\" ASC, \"id\" ASC");
    }

    #[test]
    fn compares_rows_with_nulls_last_and_tie_break() {
        let ordering = FilterOrder::build(&POSTS, &SortSpec::new("votes", SortDirection::Asc));
        let row = |id: &str, votes: Value| {
            let mut m = Map::new();
            m.insert("id".into(), json!(id));
            m.insert("votes".into(), votes);
            m
        };
        let a = row("00000000-0000-0000-0000-000000000001", json!(3));
        let b = row("00000000-0000-0000-0000-000000000002", json!(3));
        let c = row("00000000-0000-0000-0000-000000000003", Value::Null);

        assert_eq!(ordering.compare(&a, &b), CmpOrdering::Less);
        assert_eq!(ordering.compare(&c, &a), CmpOrdering::Greater);
    }
}
