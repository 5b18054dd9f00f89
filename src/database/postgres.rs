use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::query_builder::{bind_param_query, bind_param_query_as, QueryBuilder};
use crate::database::store::{Database, RowValues, Store};
use crate::filter::{Filter, FilterOrder, Ordering, PageSpec, Predicate, SortSpec, SqlResult};
use crate::schema::Entity;

/// Postgres-backed [`Database`]; every session is one transaction.
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
    config: Arc<DatabaseConfig>,
}

impl PgDatabase {
    pub fn new(pool: PgPool, config: DatabaseConfig) -> Self {
        Self { pool, config: Arc::new(config) }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::connect(config).await?;
        Ok(Self::new(pool, config.clone()))
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Session = PgSession;

    async fn begin(&self) -> Result<PgSession, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(PgSession { tx, config: self.config.clone() })
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

/// Open transaction. Dropping it without [`Store::commit`] rolls back.
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
    config: Arc<DatabaseConfig>,
}

impl PgSession {
    async fn fetch<E: Entity>(&mut self, sql: SqlResult) -> Result<Vec<E>, DatabaseError> {
        let started = Instant::now();
        let mut q = sqlx::query_as::<_, E>(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(&mut *self.tx).await?;
        self.log_query(&sql, started);
        Ok(rows)
    }

    async fn execute(&mut self, sql: SqlResult) -> Result<u64, DatabaseError> {
        let started = Instant::now();
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let result = q.execute(&mut *self.tx).await?;
        self.log_query(&sql, started);
        Ok(result.rows_affected())
    }

    async fn fetch_count(&mut self, sql: SqlResult) -> Result<i64, DatabaseError> {
        let started = Instant::now();
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(&mut *self.tx).await?;
        let count: i64 = row.try_get("count")?;
        self.log_query(&sql, started);
        Ok(count)
    }

    fn log_query(&self, sql: &SqlResult, started: Instant) {
        let elapsed = started.elapsed();
        if self.config.enable_query_logging {
            tracing::debug!(params = sql.params.len(), elapsed_ms = elapsed.as_millis() as u64, "SQL: {}", sql.query);
        }
        if self.config.enable_slow_query_warning && elapsed.as_millis() as u64 >= self.config.slow_query_threshold_ms {
            tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "Slow query: {}", sql.query);
        }
    }
}

#[async_trait]
impl Store for PgSession {
    async fn select<E: Entity>(
        &mut self,
        predicate: &Predicate,
        ordering: &Ordering,
        page: Option<PageSpec>,
    ) -> Result<Vec<E>, DatabaseError> {
        let sql = Filter::new(predicate.clone(), ordering.clone(), page).to_sql();
        self.fetch(sql).await
    }

    async fn count<E: Entity>(&mut self, predicate: &Predicate) -> Result<i64, DatabaseError> {
        let ordering = FilterOrder::build(E::SCHEMA, &SortSpec::default());
        let sql = Filter::new(predicate.clone(), ordering, None).to_count_sql();
        self.fetch_count(sql).await
    }

    async fn exists(&mut self, predicate: &Predicate) -> Result<bool, DatabaseError> {
        let ordering = FilterOrder::build(predicate.schema(), &SortSpec::default());
        let sql = Filter::new(predicate.clone(), ordering, None).to_count_sql();
        Ok(self.fetch_count(sql).await? > 0)
    }

    async fn insert_many<E: Entity>(&mut self, rows: Vec<RowValues>) -> Result<Vec<E>, DatabaseError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let sql = QueryBuilder::new(E::SCHEMA).insert_many(&rows)?;
        let inserted = self.fetch::<E>(sql).await?;
        if inserted.len() != rows.len() {
            return Err(DatabaseError::QueryError(format!(
                "inserted {} of {} rows into {}",
                inserted.len(),
                rows.len(),
                E::SCHEMA.table
            )));
        }
        Ok(inserted)
    }

    async fn update_one<E: Entity>(
        &mut self,
        scope: &Predicate,
        id: Uuid,
        patch: RowValues,
    ) -> Result<Option<E>, DatabaseError> {
        match QueryBuilder::new(E::SCHEMA).update_one(scope, id, &patch)? {
            Some(sql) => Ok(self.fetch::<E>(sql).await?.into_iter().next()),
            None => {
                let ordering = FilterOrder::build(E::SCHEMA, &SortSpec::default());
                let rows = self.select::<E>(&scope.clone().with_id(id), &ordering, None).await?;
                Ok(rows.into_iter().next())
            }
        }
    }

    async fn delete_many<E: Entity>(&mut self, scope: &Predicate, ids: &[Uuid]) -> Result<u64, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = QueryBuilder::new(E::SCHEMA).delete_many(scope, ids);
        self.execute(sql).await
    }

    async fn commit(self) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }
}
