use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::CASCADES;
use crate::database::query_builder::QueryBuilder;
use crate::database::store::{Database, RowValues, Store};
use crate::filter::{Ordering, PageSpec, Predicate, SqlParam};
use crate::schema::{Entity, EntitySchema};

type Row = Map<String, Value>;
type Tables = HashMap<&'static str, Vec<Row>>;

/// In-process [`Database`] holding rows as JSON objects.
///
/// Sessions are serialized: `begin` takes the write lock for the lifetime of
/// the session and works on a staged copy, which `commit` publishes. Dropping
/// a session discards the copy. Rows are filtered and ordered through
/// [`Predicate::matches`] and [`Ordering::compare`], so results agree with the
/// Postgres backend.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed row count for a table
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Session = MemorySession;

    async fn begin(&self) -> Result<MemorySession, DatabaseError> {
        let guard = self.tables.clone().write_owned().await;
        let staged = guard.clone();
        Ok(MemorySession { guard, staged })
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub struct MemorySession {
    guard: OwnedRwLockWriteGuard<Tables>,
    staged: Tables,
}

impl MemorySession {
    fn rows(&self, schema: &EntitySchema) -> &[Row] {
        self.staged.get(schema.table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn rows_mut(&mut self, schema: &'static EntitySchema) -> &mut Vec<Row> {
        self.staged.entry(schema.table).or_default()
    }

    /// Drop matching rows, returning their ids
    fn remove_where(&mut self, schema: &'static EntitySchema, hit: impl Fn(&Row) -> bool) -> Vec<String> {
        let mut removed = vec![];
        self.rows_mut(schema).retain(|r| {
            if !hit(r) {
                return true;
            }
            if let Some(id) = r.get(schema.id_field).and_then(Value::as_str) {
                removed.push(id.to_string());
            }
            false
        });
        removed
    }

    /// Follow `ON DELETE CASCADE` foreign keys from `table`
    fn cascade(&mut self, table: &str, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        for (parent, child, foreign_key) in CASCADES {
            if *parent != table {
                continue;
            }
            let removed = self.remove_where(child, |r| {
                r.get(*foreign_key)
                    .and_then(Value::as_str)
                    .map_or(false, |fk| ids.iter().any(|id| id == fk))
            });
            self.cascade(child.table, removed);
        }
    }

    fn decode<E: Entity>(row: &Row) -> Result<E, DatabaseError> {
        Ok(serde_json::from_value(Value::Object(row.clone()))?)
    }

    /// Materialize a new row the way the table defaults would
    fn new_row(schema: &'static EntitySchema, values: &RowValues) -> Result<Row, DatabaseError> {
        let now = SqlParam::Timestamp(Utc::now()).to_json();
        let mut row = Row::new();
        for column in schema.columns {
            let value = match values.get(column.name) {
                Some(v) => v.to_json(),
                None if column.name == schema.id_field => Value::String(Uuid::new_v4().to_string()),
                None if Some(column.name) == schema.created_field || Some(column.name) == schema.updated_field => {
                    now.clone()
                }
                None => Value::Null,
            };
            row.insert(column.name.to_string(), value);
        }
        if row.get(schema.owner_field).map_or(true, Value::is_null) {
            return Err(DatabaseError::QueryError(format!(
                "null value in column {}.{}",
                schema.table, schema.owner_field
            )));
        }
        Ok(row)
    }
}

#[async_trait]
impl Store for MemorySession {
    async fn select<E: Entity>(
        &mut self,
        predicate: &Predicate,
        ordering: &Ordering,
        page: Option<PageSpec>,
    ) -> Result<Vec<E>, DatabaseError> {
        let mut matched: Vec<&Row> = self.rows(E::SCHEMA).iter().filter(|r| predicate.matches(r)).collect();
        matched.sort_by(|a, b| ordering.compare(a, b));

        let (offset, limit) = match page {
            Some(p) => (p.offset.max(0) as usize, p.limit.max(0) as usize),
            None => (0, usize::MAX),
        };
        matched.into_iter().skip(offset).take(limit).map(Self::decode).collect()
    }

    async fn count<E: Entity>(&mut self, predicate: &Predicate) -> Result<i64, DatabaseError> {
        Ok(self.rows(E::SCHEMA).iter().filter(|r| predicate.matches(r)).count() as i64)
    }

    async fn exists(&mut self, predicate: &Predicate) -> Result<bool, DatabaseError> {
        Ok(self.rows(predicate.schema()).iter().any(|r| predicate.matches(r)))
    }

    async fn insert_many<E: Entity>(&mut self, rows: Vec<RowValues>) -> Result<Vec<E>, DatabaseError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        // Same column checks as the SQL path
        QueryBuilder::new(E::SCHEMA).insert_many(&rows)?;

        let mut created = Vec::with_capacity(rows.len());
        for values in &rows {
            created.push(Self::new_row(E::SCHEMA, values)?);
        }
        let decoded = created.iter().map(Self::decode).collect::<Result<Vec<E>, _>>()?;
        self.rows_mut(E::SCHEMA).extend(created);
        Ok(decoded)
    }

    async fn update_one<E: Entity>(
        &mut self,
        scope: &Predicate,
        id: Uuid,
        patch: RowValues,
    ) -> Result<Option<E>, DatabaseError> {
        let builder = QueryBuilder::new(E::SCHEMA);
        builder.update_one(scope, id, &patch)?;

        let target = scope.clone().with_id(id);
        let schema = E::SCHEMA;
        let Some(row) = self.rows_mut(schema).iter_mut().find(|r| target.matches(r)) else {
            return Ok(None);
        };
        for (column, value) in patch.iter() {
            if !builder.is_immutable(column) {
                row.insert(column.to_string(), value.to_json());
            }
        }
        if let Some(updated) = schema.updated_field {
            if patch.get(updated).is_none() {
                row.insert(updated.to_string(), SqlParam::Timestamp(Utc::now()).to_json());
            }
        }
        Self::decode(row).map(Some)
    }

    async fn delete_many<E: Entity>(&mut self, scope: &Predicate, ids: &[Uuid]) -> Result<u64, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let target = scope.clone().with_ids(ids);
        let removed = self.remove_where(E::SCHEMA, |r| target.matches(r));
        let deleted = removed.len() as u64;
        self.cascade(E::SCHEMA.table, removed);
        Ok(deleted)
    }

    async fn commit(mut self) -> Result<(), DatabaseError> {
        *self.guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}
