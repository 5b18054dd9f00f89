use serde_json::json;
use uuid::Uuid;

use crate::database::models::{
    Avatar, Compatibility, CompatibilityUpdate, CompatibilityUpsert, Item, Matrix, COMPATIBILITY_SCHEMA,
};
use crate::database::repository::check_references;
use crate::database::store::WriteInput;
use crate::database::{list_entities, Database, DatabaseError, Page, Repository, Store};
use crate::filter::{
    clamp_page, FilterOrder, FilterSpec, FilterWhere, ListQuery, PageBounds, Predicate, SortDirection, SortSpec,
};

/// Avatar x item compatibility cells. A cell is identified by its
/// `(avatar_id, item_id)` pair within the caller's rows.
#[derive(Clone)]
pub struct CompatibilityService<D: Database> {
    db: D,
    bounds: PageBounds,
}

impl<D: Database> CompatibilityService<D> {
    pub fn new(db: D, bounds: PageBounds) -> Self {
        Self { db, bounds }
    }

    pub async fn list(&self, owner: Uuid, query: &ListQuery) -> Result<Page<Compatibility>, DatabaseError> {
        let mut session = self.db.begin().await?;
        let page = Repository::<Compatibility>::new(self.bounds).list(&mut session, query, owner).await?;
        session.commit().await?;
        Ok(page)
    }

    /// Record `status` for the pair, creating the cell when it does not exist.
    /// Returns the cell and whether it was created.
    pub async fn upsert(&self, owner: Uuid, input: &CompatibilityUpsert) -> Result<(Compatibility, bool), DatabaseError> {
        let mut session = self.db.begin().await?;
        check_references(&mut session, owner, input.references()).await?;

        let result = match find_cell(&mut session, owner, input.avatar_id, input.item_id).await? {
            Some(cell) => (update_cell(&mut session, owner, &cell, &input.patch()).await?, false),
            None => {
                let values = input.row_values().set(COMPATIBILITY_SCHEMA.owner_field, owner);
                let created = session.insert_many::<Compatibility>(vec![values]).await?;
                let cell = created
                    .into_iter()
                    .next()
                    .ok_or_else(|| DatabaseError::QueryError("insert into compatibility returned no row".to_string()))?;
                (cell, true)
            }
        };

        tracing::info!(
            avatar = %input.avatar_id,
            item = %input.item_id,
            status = input.status.as_str(),
            created = result.1,
            "Recorded compatibility"
        );
        session.commit().await?;
        Ok(result)
    }

    /// Change an existing cell; `NotFound` when the pair has none
    pub async fn update(
        &self,
        owner: Uuid,
        avatar_id: Uuid,
        item_id: Uuid,
        input: &CompatibilityUpdate,
    ) -> Result<Compatibility, DatabaseError> {
        let mut session = self.db.begin().await?;
        let cell = find_cell(&mut session, owner, avatar_id, item_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("compatibility {}/{} not found", avatar_id, item_id)))?;
        let updated = update_cell(&mut session, owner, &cell, input).await?;
        session.commit().await?;
        Ok(updated)
    }

    /// One window of avatars and items, both by id, with every cell recorded
    /// between the avatars and items in that window.
    pub async fn matrix(&self, owner: Uuid, limit: Option<i64>, offset: Option<i64>) -> Result<Matrix, DatabaseError> {
        let page = clamp_page(limit, offset, &self.bounds);
        let by_id = SortSpec::new("id", SortDirection::Asc);
        let everything = FilterSpec::new();

        let mut session = self.db.begin().await?;
        let avatars = list_entities::<Avatar, _>(&mut session, &everything, &by_id, page, owner, true).await?;
        let items = list_entities::<Item, _>(&mut session, &everything, &by_id, page, owner, true).await?;

        let compatibilities = if avatars.rows.is_empty() || items.rows.is_empty() {
            vec![]
        } else {
            let mut cells = FilterSpec::new();
            let avatar_ids: Vec<String> = avatars.rows.iter().map(|a| a.id.to_string()).collect();
            let item_ids: Vec<String> = items.rows.iter().map(|i| i.id.to_string()).collect();
            cells.insert("avatar_id".to_string(), json!({ "$in": avatar_ids }));
            cells.insert("item_id".to_string(), json!({ "$in": item_ids }));
            let predicate = FilterWhere::build(&COMPATIBILITY_SCHEMA, &cells, owner);
            let ordering = FilterOrder::build(&COMPATIBILITY_SCHEMA, &SortSpec::default());
            session.select::<Compatibility>(&predicate, &ordering, None).await?
        };
        session.commit().await?;

        Ok(Matrix {
            avatars: avatars.rows,
            items: items.rows,
            compatibilities,
            total_avatars: avatars.total.unwrap_or_default(),
            total_items: items.total.unwrap_or_default(),
        })
    }
}

async fn find_cell<S: Store>(
    session: &mut S,
    owner: Uuid,
    avatar_id: Uuid,
    item_id: Uuid,
) -> Result<Option<Compatibility>, DatabaseError> {
    let mut pair = FilterSpec::new();
    pair.insert("avatar_id".to_string(), json!(avatar_id));
    pair.insert("item_id".to_string(), json!(item_id));
    let predicate = FilterWhere::build(&COMPATIBILITY_SCHEMA, &pair, owner);
    let ordering = FilterOrder::build(&COMPATIBILITY_SCHEMA, &SortSpec::default());
    let rows = session.select::<Compatibility>(&predicate, &ordering, None).await?;
    Ok(rows.into_iter().next())
}

async fn update_cell<S: Store>(
    session: &mut S,
    owner: Uuid,
    cell: &Compatibility,
    input: &CompatibilityUpdate,
) -> Result<Compatibility, DatabaseError> {
    let scope = Predicate::owned_by(&COMPATIBILITY_SCHEMA, owner);
    session
        .update_one::<Compatibility>(&scope, cell.id, input.row_values())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("compatibility {} not found", cell.id)))
}
