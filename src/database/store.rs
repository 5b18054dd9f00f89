use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::filter::{Ordering, PageSpec, Predicate, SqlParam};
use crate::schema::{ColumnKind, Entity};

/// Column values for one insert or update, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowValues {
    values: Vec<(&'static str, SqlParam)>,
}

impl RowValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing any earlier value for it
    pub fn set(mut self, column: &'static str, value: impl Into<SqlParam>) -> Self {
        self.insert(column, value.into());
        self
    }

    /// Set a nullable column; `None` becomes a NULL of the given kind
    pub fn set_opt<T: Into<SqlParam>>(self, column: &'static str, kind: ColumnKind, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self.set(column, SqlParam::Null(kind)),
        }
    }

    /// Set only when a value is present; used for partial updates
    pub fn set_if<T: Into<SqlParam>>(self, column: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Partial update of a nullable column: absent skips, `Some(None)` clears
    pub fn set_nullable<T: Into<SqlParam>>(
        self,
        column: &'static str,
        kind: ColumnKind,
        value: Option<Option<T>>,
    ) -> Self {
        match value {
            Some(v) => self.set_opt(column, kind, v),
            None => self,
        }
    }

    pub fn insert(&mut self, column: &'static str, value: SqlParam) {
        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    pub fn remove(&mut self, column: &str) {
        self.values.retain(|(c, _)| *c != column);
    }

    pub fn get(&self, column: &str) -> Option<&SqlParam> {
        self.values.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, SqlParam)> {
        self.values.iter()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|(c, _)| *c)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Client-facing write payload that knows which columns it sets.
pub trait WriteInput {
    fn row_values(&self) -> RowValues;
}

/// Store-access interface used by the list executor and the reconciliation
/// engine. A store value is one unit of work: writes become visible to other
/// sessions only after [`Store::commit`], and dropping it rolls back.
///
/// Every write carries a scope predicate, so a write can never touch a row
/// outside its owner (or, for child rows, outside its parent).
#[async_trait]
pub trait Store: Send {
    async fn select<E: Entity>(
        &mut self,
        predicate: &Predicate,
        ordering: &Ordering,
        page: Option<PageSpec>,
    ) -> Result<Vec<E>, DatabaseError>;

    async fn count<E: Entity>(&mut self, predicate: &Predicate) -> Result<i64, DatabaseError>;

    /// Whether any row matches; the table comes from the predicate's schema
    async fn exists(&mut self, predicate: &Predicate) -> Result<bool, DatabaseError>;

    /// Insert rows in one statement, returning them in input order
    async fn insert_many<E: Entity>(&mut self, rows: Vec<RowValues>) -> Result<Vec<E>, DatabaseError>;

    async fn update_one<E: Entity>(
        &mut self,
        scope: &Predicate,
        id: Uuid,
        patch: RowValues,
    ) -> Result<Option<E>, DatabaseError>;

    async fn delete_many<E: Entity>(&mut self, scope: &Predicate, ids: &[Uuid]) -> Result<u64, DatabaseError>;

    async fn commit(self) -> Result<(), DatabaseError>
    where
        Self: Sized;
}

/// Connection source handing out transactional [`Store`] sessions.
#[async_trait]
pub trait Database: Clone + Send + Sync + 'static {
    type Session: Store + Send + 'static;

    async fn begin(&self) -> Result<Self::Session, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
