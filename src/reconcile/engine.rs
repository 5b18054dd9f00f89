use uuid::Uuid;

use super::plan::{plan, ReconcilePlan};
use super::{ChildEntity, ChildInput, ReconcileError};
use crate::database::store::{RowValues, Store};
use crate::filter::{FilterOrder, Predicate, SortSpec, SqlParam};
use crate::schema::Entity;

/// All children of a parent, in default order
pub async fn load_existing<C, S>(session: &mut S, parent_id: Uuid) -> Result<Vec<C>, ReconcileError>
where
    C: ChildEntity,
    S: Store,
{
    let scope = Predicate::owned_by(C::SCHEMA, parent_id);
    let ordering = FilterOrder::build(C::SCHEMA, &SortSpec::default());
    Ok(session.select::<C>(&scope, &ordering, None).await?)
}

/// Write a plan: batch insert, batch delete, then row-by-row updates. Every
/// statement is scoped to `parent_id`. Returns the surviving rows ordered by
/// their position in the desired list.
pub async fn apply<C, S>(
    session: &mut S,
    parent_id: Uuid,
    plan: ReconcilePlan<C::Input>,
) -> Result<Vec<C>, ReconcileError>
where
    C: ChildEntity,
    S: Store,
{
    let schema = C::SCHEMA;
    let scope = Predicate::owned_by(schema, parent_id);
    let mut placed: Vec<(usize, C)> = Vec::with_capacity(plan.create.len() + plan.update.len());

    if !plan.create.is_empty() {
        let rows: Vec<RowValues> = plan
            .create
            .iter()
            .map(|c| child_values::<C>(&c.input, c.position).set(schema.owner_field, parent_id))
            .collect();
        let created = session.insert_many::<C>(rows).await?;
        placed.extend(plan.create.iter().map(|c| c.position).zip(created));
    }

    if !plan.delete.is_empty() {
        let deleted = session.delete_many::<C>(&scope, &plan.delete).await?;
        if deleted != plan.delete.len() as u64 {
            tracing::warn!(
                table = schema.table,
                expected = plan.delete.len(),
                deleted,
                "Fewer children deleted than planned"
            );
        }
    }

    for update in &plan.update {
        let values = child_values::<C>(&update.input, update.position);
        let row = session
            .update_one::<C>(&scope, update.id, values)
            .await?
            .ok_or(ReconcileError::ChildVanished { table: schema.table, id: update.id })?;
        placed.push((update.position, row));
    }

    tracing::info!(
        table = schema.table,
        parent = %parent_id,
        created = plan.create.len(),
        updated = plan.update.len(),
        deleted = plan.delete.len(),
        "Reconciled children"
    );

    placed.sort_by_key(|(position, _)| *position);
    Ok(placed.into_iter().map(|(_, row)| row).collect())
}

/// Plan against `existing` and apply.
pub async fn reconcile<C, S>(
    session: &mut S,
    parent_id: Uuid,
    existing: &[C],
    desired: &[C::Input],
) -> Result<Vec<C>, ReconcileError>
where
    C: ChildEntity,
    S: Store,
{
    let existing_ids: Vec<Uuid> = existing.iter().map(Entity::id).collect();
    let plan = plan(&existing_ids, desired)?;
    apply::<C, S>(session, parent_id, plan).await
}

/// Load the parent's current children, then reconcile them to `desired`.
pub async fn sync<C, S>(session: &mut S, parent_id: Uuid, desired: &[C::Input]) -> Result<Vec<C>, ReconcileError>
where
    C: ChildEntity,
    S: Store,
{
    let existing = load_existing::<C, S>(session, parent_id).await?;
    reconcile::<C, S>(session, parent_id, &existing, desired).await
}

/// Input values with identity stripped and position stamped
fn child_values<C: ChildEntity>(input: &C::Input, position: usize) -> RowValues {
    let mut values = input.row_values();
    values.remove(C::SCHEMA.id_field);
    values.remove(C::SCHEMA.owner_field);
    if let Some(field) = C::POSITION_FIELD {
        values.insert(field, SqlParam::Integer(position as i64 + 1));
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDatabase;
    use crate::database::models::{RecipeStep, StepInput};
    use crate::database::store::Database;

    fn step(id: Option<Uuid>, name: &str) -> StepInput {
        StepInput { id, step_number: None, name: name.to_string(), description: String::new(), image_url: None }
    }

    #[tokio::test]
    async fn creates_updates_and_deletes() {
        let db = MemoryDatabase::new();
        let recipe = Uuid::new_v4();
        let mut session = db.begin().await.unwrap();

        let first: Vec<RecipeStep> = sync(&mut session, recipe, &[step(None, "s1"), step(None, "s2")]).await.unwrap();
        assert_eq!(first.iter().map(|s| s.step_number).collect::<Vec<_>>(), vec![1, 2]);

        let desired = [step(Some(first[0].id), "A"), step(None, "B")];
        let second: Vec<RecipeStep> = sync(&mut session, recipe, &desired).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[0].name, "A");
        assert_eq!(second[1].name, "B");
        assert_ne!(second[1].id, first[1].id);

        let stored: Vec<RecipeStep> = load_existing(&mut session, recipe).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|s| s.id != first[1].id));
    }

    #[tokio::test]
    async fn positions_follow_desired_order() {
        let db = MemoryDatabase::new();
        let recipe = Uuid::new_v4();
        let mut session = db.begin().await.unwrap();
        let rows: Vec<RecipeStep> = sync(&mut session, recipe, &[step(None, "a"), step(None, "b"), step(None, "c")])
            .await
            .unwrap();

        let mut reordered = StepInput { step_number: Some(99), ..step(Some(rows[2].id), "c") };
        reordered.description = "moved".to_string();
        let desired = [reordered, step(Some(rows[0].id), "a"), step(None, "d")];
        let result: Vec<RecipeStep> = sync(&mut session, recipe, &desired).await.unwrap();

        assert_eq!(result.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["c", "a", "d"]);
        assert_eq!(result.iter().map(|s| s.step_number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(result[0].description, "moved");
    }

    #[tokio::test]
    async fn other_parents_children_are_untouched() {
        let db = MemoryDatabase::new();
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let mut session = db.begin().await.unwrap();
        let foreign: Vec<RecipeStep> = sync(&mut session, theirs, &[step(None, "keep")]).await.unwrap();

        let result: Vec<RecipeStep> = sync(&mut session, mine, &[step(Some(foreign[0].id), "stolen")]).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_ne!(result[0].id, foreign[0].id);
        assert_eq!(result[0].recipe_id, mine);

        let untouched: Vec<RecipeStep> = load_existing(&mut session, theirs).await.unwrap();
        assert_eq!(untouched, foreign);
    }
}
