use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{self, postgres::PgArguments, FromRow};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::store::RowValues;
use crate::filter::{Predicate, SqlParam, SqlResult};
use crate::schema::{ColumnKind, EntitySchema};

/// Renders the write statements for one entity. Reads are rendered by
/// [`crate::filter::Filter`]; this covers INSERT, UPDATE and DELETE.
pub struct QueryBuilder {
    schema: &'static EntitySchema,
}

impl QueryBuilder {
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self { schema }
    }

    /// Multi-row INSERT ... RETURNING *. Columns a row leaves unset take
    /// their table default.
    pub fn insert_many(&self, rows: &[RowValues]) -> Result<SqlResult, DatabaseError> {
        if rows.is_empty() {
            return Err(DatabaseError::QueryError("insert requires at least one row".to_string()));
        }
        for row in rows {
            self.check_columns(row)?;
        }

        // Union of supplied columns, in catalog order
        let columns: Vec<&'static str> = self
            .schema
            .columns
            .iter()
            .map(|c| c.name)
            .filter(|name| rows.iter().any(|r| r.get(name).is_some()))
            .collect();
        if columns.is_empty() {
            return Err(DatabaseError::QueryError(format!("insert into {} sets no columns", self.schema.table)));
        }

        let mut params: Vec<SqlParam> = vec![];
        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let slots: Vec<String> = columns
                .iter()
                .map(|name| match row.get(name) {
                    Some(value) => {
                        params.push(value.clone());
                        value.placeholder(params.len())
                    }
                    None => "DEFAULT".to_string(),
                })
                .collect();
            tuples.push(format!("({})", slots.join(", ")));
        }

        let quoted: Vec<String> = columns.iter().map(|c| crate::schema::quote_identifier(c)).collect();
        let query = format!(
            "INSERT INTO {} ({}) VALUES {} RETURNING *",
            self.schema.quoted_table(),
            quoted.join(", "),
            tuples.join(", ")
        );
        Ok(SqlResult { query, params })
    }

    /// Scoped single-row UPDATE ... RETURNING *. Returns `None` when there is
    /// nothing to assign, in which case the caller reads the row instead.
    pub fn update_one(&self, scope: &Predicate, id: Uuid, patch: &RowValues) -> Result<Option<SqlResult>, DatabaseError> {
        self.check_columns(patch)?;

        let mut params: Vec<SqlParam> = vec![];
        let mut assignments: Vec<String> = vec![];
        for (column, value) in patch.iter() {
            if self.is_immutable(column) {
                tracing::warn!("Ignoring update of immutable column {}.{}", self.schema.table, column);
                continue;
            }
            params.push(value.clone());
            assignments.push(format!(
                "{} = {}",
                crate::schema::quote_identifier(column),
                value.placeholder(params.len())
            ));
        }
        if let Some(updated) = self.schema.updated_field {
            if patch.get(updated).is_none() {
                assignments.push(format!("{} = now()", crate::schema::quote_identifier(updated)));
            }
        }
        if assignments.is_empty() {
            return Ok(None);
        }

        let where_clause = scope.clone().with_id(id).to_sql(&mut params);
        let query = format!(
            "UPDATE {} SET {} WHERE {} RETURNING *",
            self.schema.quoted_table(),
            assignments.join(", "),
            where_clause
        );
        Ok(Some(SqlResult { query, params }))
    }

    /// Scoped DELETE by id list
    pub fn delete_many(&self, scope: &Predicate, ids: &[Uuid]) -> SqlResult {
        let mut params: Vec<SqlParam> = vec![];
        let where_clause = scope.clone().with_ids(ids).to_sql(&mut params);
        let query = format!("DELETE FROM {} WHERE {}", self.schema.quoted_table(), where_clause);
        SqlResult { query, params }
    }

    /// Identity and scope columns cannot be rewritten by an update
    pub fn is_immutable(&self, column: &str) -> bool {
        column == self.schema.id_field || column == self.schema.owner_field
    }

    fn check_columns(&self, values: &RowValues) -> Result<(), DatabaseError> {
        for column in values.columns() {
            if self.schema.column(column).is_none() {
                return Err(DatabaseError::QueryError(format!(
                    "unknown column {}.{}",
                    self.schema.table, column
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        SqlParam::Uuid(u) => q.bind(*u),
        SqlParam::Text(s) => q.bind(s.clone()),
        SqlParam::Integer(i) => q.bind(*i),
        SqlParam::Float(f) => q.bind(*f),
        SqlParam::Bool(b) => q.bind(*b),
        SqlParam::Timestamp(t) => q.bind(*t),
        // Sent as text; the placeholder carries the enum cast
        SqlParam::Enum { label, .. } => q.bind(label.clone()),
        SqlParam::Json(v) => q.bind(v.clone()),
        SqlParam::Null(kind) => match kind {
            ColumnKind::Uuid => q.bind(None::<Uuid>),
            ColumnKind::Text | ColumnKind::Enum { .. } => q.bind(None::<String>),
            ColumnKind::Integer => q.bind(None::<i64>),
            ColumnKind::Float => q.bind(None::<f64>),
            ColumnKind::Bool => q.bind(None::<bool>),
            ColumnKind::Timestamp => q.bind(None::<DateTime<Utc>>),
            ColumnKind::Json => q.bind(None::<Value>),
        },
    }
}

pub(crate) fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        SqlParam::Uuid(u) => q.bind(*u),
        SqlParam::Text(s) => q.bind(s.clone()),
        SqlParam::Integer(i) => q.bind(*i),
        SqlParam::Float(f) => q.bind(*f),
        SqlParam::Bool(b) => q.bind(*b),
        SqlParam::Timestamp(t) => q.bind(*t),
        SqlParam::Enum { label, .. } => q.bind(label.clone()),
        SqlParam::Json(v) => q.bind(v.clone()),
        SqlParam::Null(kind) => match kind {
            ColumnKind::Uuid => q.bind(None::<Uuid>),
            ColumnKind::Text | ColumnKind::Enum { .. } => q.bind(None::<String>),
            ColumnKind::Integer => q.bind(None::<i64>),
            ColumnKind::Float => q.bind(None::<f64>),
            ColumnKind::Bool => q.bind(None::<bool>),
            ColumnKind::Timestamp => q.bind(None::<DateTime<Utc>>),
            ColumnKind::Json => q.bind(None::<Value>),
        },
    }
}
