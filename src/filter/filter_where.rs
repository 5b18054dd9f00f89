use serde_json::{Map, Value};
use uuid::Uuid;

use super::types::{FilterOp, FilterSpec, SqlParam};
use crate::schema::{Column, EntitySchema};

/// One comparison against a whitelisted column.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: Column,
    pub operator: FilterOp,
    pub values: Vec<SqlParam>,
}

impl Condition {
    /// Build a condition from client data, or `None` when the operator data
    /// cannot be expressed against this column.
    fn coerce(column: Column, operator: FilterOp, data: &Value) -> Option<Self> {
        let values = match (operator, data) {
            (FilterOp::In, Value::Array(items)) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match SqlParam::coerce(column.kind, item) {
                        Some(v) if !v.is_null() => values.push(v),
                        _ => return None,
                    }
                }
                values
            }
            (FilterOp::In, _) => return None,
            (_, Value::Array(_)) | (_, Value::Object(_)) => return None,
            (FilterOp::Eq | FilterOp::Ne, scalar) => vec![SqlParam::coerce(column.kind, scalar)?],
            (_, scalar) => match SqlParam::coerce(column.kind, scalar)? {
                // Range comparisons against NULL never match; refuse them outright
                SqlParam::Null(_) => return None,
                v => vec![v],
            },
        };
        Some(Self { column, operator, values })
    }

    fn to_sql(&self, params: &mut Vec<SqlParam>) -> String {
        let quoted = self.column.quoted();
        match (self.operator, self.values.as_slice()) {
            (FilterOp::Eq, [v]) if v.is_null() => format!("{} IS NULL", quoted),
            (FilterOp::Ne, [v]) if v.is_null() => format!("{} IS NOT NULL", quoted),
            (FilterOp::In, []) => "1=0".to_string(),
            (FilterOp::In, values) => {
                let placeholders: Vec<String> = values.iter().map(|v| push_param(params, v.clone())).collect();
                format!("{} IN ({})", quoted, placeholders.join(", "))
            }
            (op, values) => {
                let placeholder = match values.first() {
                    Some(v) => push_param(params, v.clone()),
                    None => return "1=0".to_string(),
                };
                format!("{} {} {}", quoted, op.to_sql(), placeholder)
            }
        }
    }

    fn matches(&self, row: &Map<String, Value>) -> bool {
        let stored = stored_value(row, self.column);
        match (self.operator, self.values.as_slice()) {
            (FilterOp::Eq, [v]) if v.is_null() => stored.is_null(),
            (FilterOp::Ne, [v]) if v.is_null() => !stored.is_null(),
            (FilterOp::In, values) => values
                .iter()
                .any(|v| stored.compare(v).is_some_and(|o| FilterOp::In.accepts(o))),
            (op, [v]) => stored.compare(v).is_some_and(|o| op.accepts(o)),
            _ => false,
        }
    }
}

fn push_param(params: &mut Vec<SqlParam>, value: SqlParam) -> String {
    params.push(value);
    params[params.len() - 1].placeholder(params.len())
}

/// Read a column out of a JSON row as a typed value; unreadable data is NULL
pub(crate) fn stored_value(row: &Map<String, Value>, column: Column) -> SqlParam {
    row.get(column.name)
        .and_then(|v| SqlParam::coerce(column.kind, v))
        .unwrap_or(SqlParam::Null(column.kind))
}

/// Conjunction of whitelisted conditions, always including the owner scope.
///
/// There is no constructor without an owner: every predicate that reaches a
/// store restricts rows to `owner_field = owner`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    schema: &'static EntitySchema,
    owner: Uuid,
    conditions: Vec<Condition>,
}

impl Predicate {
    /// Owner scope alone
    pub fn owned_by(schema: &'static EntitySchema, owner: Uuid) -> Self {
        Self { schema, owner, conditions: vec![] }
    }

    /// Owner scope narrowed to one row
    pub fn for_id(schema: &'static EntitySchema, owner: Uuid, id: Uuid) -> Self {
        Self::owned_by(schema, owner).with_id(id)
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.conditions.push(Condition {
            column: self.schema.id_column(),
            operator: FilterOp::Eq,
            values: vec![SqlParam::Uuid(id)],
        });
        self
    }

    pub fn with_ids(mut self, ids: &[Uuid]) -> Self {
        self.conditions.push(Condition {
            column: self.schema.id_column(),
            operator: FilterOp::In,
            values: ids.iter().copied().map(SqlParam::Uuid).collect(),
        });
        self
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Render as a parameterized WHERE body. Placeholders continue from the
    /// parameters already in `params`.
    pub fn to_sql(&self, params: &mut Vec<SqlParam>) -> String {
        let owner = self.schema.owner_column();
        let mut parts = vec![format!("{} = {}", owner.quoted(), push_param(params, SqlParam::Uuid(self.owner)))];
        for condition in &self.conditions {
            parts.push(condition.to_sql(params));
        }
        parts.join(" AND ")
    }

    /// Evaluate against a JSON row with the same semantics as the SQL form
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        let owner = stored_value(row, self.schema.owner_column());
        if owner != SqlParam::Uuid(self.owner) {
            return false;
        }
        self.conditions.iter().all(|c| c.matches(row))
    }
}

/// Predicate builder: turns a client filter map into a [`Predicate`].
pub struct FilterWhere;

impl FilterWhere {
    /// Keys outside the entity's filter whitelist, unknown operators and values
    /// that cannot be coerced to the column type are dropped without error.
    pub fn build(schema: &'static EntitySchema, filter: &FilterSpec, owner: Uuid) -> Predicate {
        let mut predicate = Predicate::owned_by(schema, owner);

        for (field, value) in filter {
            let Some(column) = schema.filterable_column(field) else {
                tracing::debug!("Dropping filter on non-whitelisted field {}.{}", schema.table, field);
                continue;
            };

            match value {
                Value::Object(ops) => {
                    for (op_key, op_value) in ops {
                        let Some(operator) = FilterOp::parse(op_key) else {
                            tracing::debug!("Dropping unsupported operator {} on {}.{}", op_key, schema.table, field);
                            continue;
                        };
                        Self::push(&mut predicate, *column, operator, op_value);
                    }
                }
                scalar => Self::push(&mut predicate, *column, FilterOp::Eq, scalar),
            }
        }

        predicate
    }

    fn push(predicate: &mut Predicate, column: Column, operator: FilterOp, data: &Value) {
        match Condition::coerce(column, operator, data) {
            Some(condition) => predicate.conditions.push(condition),
            None => tracing::debug!("Dropping malformed {:?} value for {}", operator, column.name),
        }
    }
}
