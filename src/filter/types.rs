use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::schema::ColumnKind;

/// Client filter map: whitelisted field name to either a bare scalar (equality)
/// or an operator object such as `{ "$gte": "2024-01-01T00:00:00Z" }`.
pub type FilterSpec = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$ne")] Ne,
    #[serde(rename = "$gt")] Gt,
    #[serde(rename = "$gte")] Gte,
    #[serde(rename = "$lt")] Lt,
    #[serde(rename = "$lte")] Lte,
    #[serde(rename = "$in")] In,
}

impl FilterOp {
    pub fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            _ => return None,
        })
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "IN",
        }
    }

    /// Whether a comparison outcome satisfies this operator
    pub fn accepts(&self, ordering: CmpOrdering) -> bool {
        match self {
            FilterOp::Eq | FilterOp::In => ordering == CmpOrdering::Equal,
            FilterOp::Ne => ordering != CmpOrdering::Equal,
            FilterOp::Gt => ordering == CmpOrdering::Greater,
            FilterOp::Gte => ordering != CmpOrdering::Less,
            FilterOp::Lt => ordering == CmpOrdering::Less,
            FilterOp::Lte => ordering != CmpOrdering::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Requested sort key and direction, both optional and not yet checked
/// against any whitelist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: Option<String>,
    pub direction: Option<SortDirection>,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: Some(field.into()), direction: Some(direction) }
    }
}

/// Typed value bound into generated SQL, or compared by the memory store.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Uuid(Uuid),
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    /// Label plus its declared label list, which fixes the sort order
    Enum { type_name: &'static str, labels: &'static [&'static str], label: String },
    Json(Value),
    /// NULL carrying its column kind so Postgres sees a correctly typed parameter
    Null(ColumnKind),
}

impl SqlParam {
    /// Coerce a JSON value into the column's kind. Returns `None` when the
    /// value cannot represent that kind.
    pub fn coerce(kind: ColumnKind, value: &Value) -> Option<Self> {
        if value.is_null() {
            return Some(SqlParam::Null(kind));
        }
        match kind {
            ColumnKind::Uuid => value.as_str().and_then(|s| Uuid::parse_str(s).ok()).map(SqlParam::Uuid),
            ColumnKind::Text => value.as_str().map(|s| SqlParam::Text(s.to_string())),
            ColumnKind::Integer => value.as_i64().map(SqlParam::Integer),
            ColumnKind::Float => value.as_f64().map(SqlParam::Float),
            ColumnKind::Bool => value.as_bool().map(SqlParam::Bool),
            ColumnKind::Timestamp => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| SqlParam::Timestamp(dt.with_timezone(&Utc))),
            ColumnKind::Enum { type_name, labels } => value
                .as_str()
                .filter(|s| labels.contains(s))
                .map(|s| SqlParam::Enum { type_name, labels, label: s.to_string() }),
            ColumnKind::Json => Some(SqlParam::Json(value.clone())),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlParam::Null(_))
    }

    /// JSON form matching how row types serialize the column
    pub fn to_json(&self) -> Value {
        match self {
            SqlParam::Uuid(u) => Value::String(u.to_string()),
            SqlParam::Text(s) => Value::String(s.clone()),
            SqlParam::Integer(i) => Value::from(*i),
            SqlParam::Float(f) => Value::from(*f),
            SqlParam::Bool(b) => Value::Bool(*b),
            SqlParam::Timestamp(dt) => Value::String(dt.to_rfc3339()),
            SqlParam::Enum { label, .. } => Value::String(label.clone()),
            SqlParam::Json(v) => v.clone(),
            SqlParam::Null(_) => Value::Null,
        }
    }

    /// Positional placeholder, cast when the target is a Postgres enum
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            SqlParam::Enum { type_name, .. }
            | SqlParam::Null(ColumnKind::Enum { type_name, .. }) => format!("${}::{}", index, type_name),
            _ => format!("${}", index),
        }
    }

    /// SQL-style comparison: NULLs and mismatched kinds are incomparable
    pub fn compare(&self, other: &SqlParam) -> Option<CmpOrdering> {
        match (self, other) {
            (SqlParam::Uuid(a), SqlParam::Uuid(b)) => Some(a.cmp(b)),
            (SqlParam::Text(a), SqlParam::Text(b)) => Some(a.cmp(b)),
            (SqlParam::Integer(a), SqlParam::Integer(b)) => Some(a.cmp(b)),
            (SqlParam::Float(a), SqlParam::Float(b)) => a.partial_cmp(b),
            (SqlParam::Integer(a), SqlParam::Float(b)) => (*a as f64).partial_cmp(b),
            (SqlParam::Float(a), SqlParam::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (SqlParam::Bool(a), SqlParam::Bool(b)) => Some(a.cmp(b)),
            (SqlParam::Timestamp(a), SqlParam::Timestamp(b)) => Some(a.cmp(b)),
            // Declaration order, as Postgres compares enum values
            (
                SqlParam::Enum { type_name: ta, labels, label: a },
                SqlParam::Enum { type_name: tb, label: b, .. },
            ) if ta == tb => {
                let rank = |l: &str| labels.iter().position(|x| *x == l);
                Some(rank(a.as_str())?.cmp(&rank(b.as_str())?))
            }
            _ => None,
        }
    }
}

impl From<Uuid> for SqlParam {
    fn from(v: Uuid) -> Self {
        SqlParam::Uuid(v)
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Integer(v)
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Integer(v as i64)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl From<DateTime<Utc>> for SqlParam {
    fn from(v: DateTime<Utc>) -> Self {
        SqlParam::Timestamp(v)
    }
}

impl From<Value> for SqlParam {
    fn from(v: Value) -> Self {
        SqlParam::Json(v)
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STATES: &[&str] = &["private", "public"];

    #[test]
    fn coerces_by_column_kind() {
        let id = Uuid::new_v4();
        assert_eq!(SqlParam::coerce(ColumnKind::Uuid, &json!(id.to_string())), Some(SqlParam::Uuid(id)));
        assert_eq!(SqlParam::coerce(ColumnKind::Uuid, &json!("nope")), None);
        assert_eq!(SqlParam::coerce(ColumnKind::Text, &json!(5)), None);
        assert_eq!(SqlParam::coerce(ColumnKind::Integer, &json!(5)), Some(SqlParam::Integer(5)));
        assert!(matches!(
            SqlParam::coerce(ColumnKind::Timestamp, &json!("2024-05-01T10:00:00+09:00")),
            Some(SqlParam::Timestamp(_))
        ));
        assert_eq!(SqlParam::coerce(ColumnKind::Text, &Value::Null), Some(SqlParam::Null(ColumnKind::Text)));
    }

    #[test]
    fn enum_labels_are_checked() {
        let kind = ColumnKind::Enum { type_name: "recipe_state", labels: STATES };
        assert!(SqlParam::coerce(kind, &json!("public")).is_some());
        assert!(SqlParam::coerce(kind, &json!("secret")).is_none());
    }

    #[test]
    fn enum_placeholders_are_cast() {
        let p = SqlParam::Enum { type_name: "recipe_state", labels: STATES, label: "public".into() };
        assert_eq!(p.placeholder(3), "$3::recipe_state");
        assert_eq!(SqlParam::Text("x".into()).placeholder(1), "$1");
    }

    #[test]
    fn nulls_are_incomparable() {
        let null = SqlParam::Null(ColumnKind::Integer);
        assert_eq!(null.compare(&SqlParam::Integer(1)), None);
        assert_eq!(SqlParam::Integer(1).compare(&SqlParam::Integer(2)), Some(CmpOrdering::Less));
    }

    #[test]
    fn enums_compare_in_declaration_order() {
        let kind = ColumnKind::Enum { type_name: "size", labels: &["small", "medium", "large"] };
        let value = |l: &str| SqlParam::coerce(kind, &json!(l)).unwrap();
        assert_eq!(value("small").compare(&value("medium")), Some(CmpOrdering::Less));
        assert_eq!(value("large").compare(&value("medium")), Some(CmpOrdering::Greater));
        assert_eq!(value("large").compare(&value("large")), Some(CmpOrdering::Equal));
    }

    #[test]
    fn sort_direction_parses_case_insensitively() {
        assert_eq!(SortDirection::parse("DESC"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("up"), None);
    }
}
