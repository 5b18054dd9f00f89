use serde::Serialize;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Resource;
use crate::database::store::{Store, WriteInput};
use crate::filter::{
    clamp_page, FilterOrder, FilterSpec, FilterWhere, ListQuery, PageBounds, PageSpec, Predicate, SortSpec,
};
use crate::schema::{Entity, EntitySchema};

/// One page of owner-scoped rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<E> {
    pub rows: Vec<E>,
    /// Size of the filtered, owner-scoped set; only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

/// List query executor: composes predicate, ordering and page window into one
/// read, plus an optional count over the same predicate.
pub async fn list_entities<E, S>(
    session: &mut S,
    filter: &FilterSpec,
    sort: &SortSpec,
    page: PageSpec,
    owner: Uuid,
    with_total: bool,
) -> Result<Page<E>, DatabaseError>
where
    E: Entity,
    S: Store,
{
    let predicate = FilterWhere::build(E::SCHEMA, filter, owner);
    let ordering = FilterOrder::build(E::SCHEMA, sort);

    let rows = session.select::<E>(&predicate, &ordering, Some(page)).await?;
    let total = if with_total {
        Some(session.count::<E>(&predicate).await?)
    } else {
        None
    };

    tracing::debug!(
        table = E::SCHEMA.table,
        rows = rows.len(),
        limit = page.limit,
        offset = page.offset,
        "Listed entities"
    );
    Ok(Page { rows, total, limit: page.limit, offset: page.offset })
}

/// Owner-scoped CRUD over one entity type.
pub struct Repository<E> {
    bounds: PageBounds,
    _phantom: std::marker::PhantomData<E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(bounds: PageBounds) -> Self {
        Self { bounds, _phantom: std::marker::PhantomData }
    }

    pub async fn list<S: Store>(&self, session: &mut S, query: &ListQuery, owner: Uuid) -> Result<Page<E>, DatabaseError> {
        let page = clamp_page(query.limit, query.offset, &self.bounds);
        list_entities::<E, S>(session, &query.filter, &query.sort, page, owner, query.with_total).await
    }

    pub async fn select_one<S: Store>(&self, session: &mut S, owner: Uuid, id: Uuid) -> Result<Option<E>, DatabaseError> {
        let predicate = Predicate::for_id(E::SCHEMA, owner, id);
        let ordering = FilterOrder::build(E::SCHEMA, &SortSpec::default());
        let rows = session.select::<E>(&predicate, &ordering, None).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn select_404<S: Store>(&self, session: &mut S, owner: Uuid, id: Uuid) -> Result<E, DatabaseError> {
        self.select_one(session, owner, id)
            .await?
            .ok_or_else(|| not_found(E::SCHEMA, id))
    }

    pub async fn delete<S: Store>(&self, session: &mut S, owner: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let scope = Predicate::owned_by(E::SCHEMA, owner);
        match session.delete_many::<E>(&scope, &[id]).await? {
            0 => Err(not_found(E::SCHEMA, id)),
            _ => Ok(()),
        }
    }
}

impl<E: Resource> Repository<E> {
    pub async fn create<S: Store>(&self, session: &mut S, owner: Uuid, input: &E::Create) -> Result<E, DatabaseError> {
        let values = input.row_values();
        check_references(session, owner, E::references(&values)).await?;

        let values = values.set(E::SCHEMA.owner_field, owner);
        let created = session.insert_many::<E>(vec![values]).await?;
        let row = created
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::QueryError(format!("insert into {} returned no row", E::SCHEMA.table)))?;

        tracing::info!(table = E::SCHEMA.table, id = %row.id(), "Created record");
        Ok(row)
    }

    pub async fn update<S: Store>(
        &self,
        session: &mut S,
        owner: Uuid,
        id: Uuid,
        input: &E::Update,
    ) -> Result<E, DatabaseError> {
        let values = input.row_values();
        check_references(session, owner, E::references(&values)).await?;

        let scope = Predicate::owned_by(E::SCHEMA, owner);
        let row = session
            .update_one::<E>(&scope, id, values)
            .await?
            .ok_or_else(|| not_found(E::SCHEMA, id))?;

        tracing::info!(table = E::SCHEMA.table, id = %id, "Updated record");
        Ok(row)
    }
}

/// Each referenced row must exist under the same owner
pub async fn check_references<S: Store>(
    session: &mut S,
    owner: Uuid,
    references: Vec<(&'static EntitySchema, Uuid)>,
) -> Result<(), DatabaseError> {
    for (schema, id) in references {
        if !session.exists(&Predicate::for_id(schema, owner, id)).await? {
            return Err(DatabaseError::InvalidReference(format!("{} {} not found", schema.table, id)));
        }
    }
    Ok(())
}

fn not_found(schema: &EntitySchema, id: Uuid) -> DatabaseError {
    DatabaseError::NotFound(format!("{} {} not found", schema.table, id))
}
