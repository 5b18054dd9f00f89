use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

use outfit_recipe_api::database::models::{RecipeAsset, RecipeAssetInput, RecipeStep, StepInput};
use outfit_recipe_api::database::{Database, MemoryDatabase, Store};
use outfit_recipe_api::reconcile::{self, ReconcileError};

fn step(id: Option<Uuid>, name: &str) -> StepInput {
    StepInput { id, step_number: None, name: name.to_string(), description: String::new(), image_url: None }
}

fn resubmit(rows: &[RecipeStep]) -> Vec<StepInput> {
    rows.iter()
        .map(|r| StepInput {
            id: Some(r.id),
            step_number: Some(r.step_number),
            name: r.name.clone(),
            description: r.description.clone(),
            image_url: r.image_url.clone(),
        })
        .collect()
}

async fn seed(db: &MemoryDatabase, recipe: Uuid, names: &[&str]) -> Result<Vec<RecipeStep>> {
    let mut session = db.begin().await?;
    let desired: Vec<StepInput> = names.iter().map(|n| step(None, n)).collect();
    let rows = reconcile::sync::<RecipeStep, _>(&mut session, recipe, &desired).await?;
    session.commit().await?;
    Ok(rows)
}

#[tokio::test]
async fn update_create_delete_in_one_pass() -> Result<()> {
    let db = MemoryDatabase::new();
    let recipe = Uuid::new_v4();
    let existing = seed(&db, recipe, &["s1", "s2"]).await?;
    let (s1, s2) = (existing[0].id, existing[1].id);

    let mut session = db.begin().await?;
    let result = reconcile::reconcile::<RecipeStep, _>(
        &mut session,
        recipe,
        &existing,
        &[step(Some(s1), "A"), step(None, "B")],
    )
    .await?;
    session.commit().await?;

    assert_eq!(result.len(), 2);
    assert_eq!((result[0].id, result[0].name.as_str()), (s1, "A"));
    assert_eq!(result[1].name, "B");
    assert!(result.iter().all(|r| r.id != s2));
    assert_eq!(db.row_count("recipe_steps").await, 2);
    Ok(())
}

#[tokio::test]
async fn resubmitting_the_result_changes_nothing() -> Result<()> {
    let db = MemoryDatabase::new();
    let recipe = Uuid::new_v4();
    let first = seed(&db, recipe, &["cut", "sew", "press"]).await?;

    let mut session = db.begin().await?;
    let existing = reconcile::load_existing::<RecipeStep, _>(&mut session, recipe).await?;
    let plan = reconcile::plan(&existing.iter().map(|r| r.id).collect::<Vec<_>>(), &resubmit(&first))?;
    assert!(plan.create.is_empty());
    assert!(plan.delete.is_empty());
    assert_eq!(plan.update.len(), 3);

    let second = reconcile::apply::<RecipeStep, _>(&mut session, recipe, plan).await?;
    assert_eq!(second, first);
    Ok(())
}

#[tokio::test]
async fn empty_desired_list_clears_collection() -> Result<()> {
    let db = MemoryDatabase::new();
    let recipe = Uuid::new_v4();
    seed(&db, recipe, &["a", "b", "c"]).await?;

    let mut session = db.begin().await?;
    let result = reconcile::sync::<RecipeStep, _>(&mut session, recipe, &[]).await?;
    session.commit().await?;

    assert!(result.is_empty());
    assert_eq!(db.row_count("recipe_steps").await, 0);
    Ok(())
}

#[tokio::test]
async fn foreign_child_id_is_created_fresh() -> Result<()> {
    let db = MemoryDatabase::new();
    let mine = Uuid::new_v4();
    let theirs = Uuid::new_v4();
    let foreign = seed(&db, theirs, &["theirs"]).await?;

    let mut session = db.begin().await?;
    let result = reconcile::sync::<RecipeStep, _>(&mut session, mine, &[step(Some(foreign[0].id), "mine")]).await?;
    let untouched = reconcile::load_existing::<RecipeStep, _>(&mut session, theirs).await?;
    session.commit().await?;

    assert_eq!(result.len(), 1);
    assert_ne!(result[0].id, foreign[0].id);
    assert_eq!(result[0].recipe_id, mine);
    assert_eq!(untouched, foreign);
    Ok(())
}

#[tokio::test]
async fn duplicate_ids_fail_without_writing() -> Result<()> {
    let db = MemoryDatabase::new();
    let recipe = Uuid::new_v4();
    let existing = seed(&db, recipe, &["only"]).await?;
    let id = existing[0].id;

    let mut session = db.begin().await?;
    let err = reconcile::sync::<RecipeStep, _>(&mut session, recipe, &[step(Some(id), "x"), step(Some(id), "y")])
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::DuplicateChildId(dup) if dup == id));
    drop(session);

    let mut session = db.begin().await?;
    assert_eq!(reconcile::load_existing::<RecipeStep, _>(&mut session, recipe).await?, existing);
    Ok(())
}

#[tokio::test]
async fn abandoned_session_leaves_children_unchanged() -> Result<()> {
    let db = MemoryDatabase::new();
    let recipe = Uuid::new_v4();
    let existing = seed(&db, recipe, &["a", "b"]).await?;

    {
        let mut session = db.begin().await?;
        reconcile::sync::<RecipeStep, _>(&mut session, recipe, &[step(None, "replacement")]).await?;
        // dropped before commit
    }

    let mut session = db.begin().await?;
    assert_eq!(reconcile::load_existing::<RecipeStep, _>(&mut session, recipe).await?, existing);
    Ok(())
}

#[tokio::test]
async fn collections_reconcile_independently() -> Result<()> {
    let db = MemoryDatabase::new();
    let recipe = Uuid::new_v4();
    let asset = Uuid::new_v4();
    let steps = seed(&db, recipe, &["cut"]).await?;

    let mut session = db.begin().await?;
    let materials = reconcile::sync::<RecipeAsset, _>(
        &mut session,
        recipe,
        &[RecipeAssetInput { id: None, asset_id: asset, note: None, configuration: Some(json!({ "scale": 1.2 })) }],
    )
    .await?;
    let still = reconcile::load_existing::<RecipeStep, _>(&mut session, recipe).await?;
    session.commit().await?;

    assert_eq!(materials.len(), 1);
    assert_eq!(materials[0].configuration, Some(json!({ "scale": 1.2 })));
    assert_eq!(still, steps);
    Ok(())
}

#[tokio::test]
async fn step_numbers_follow_list_order() -> Result<()> {
    let db = MemoryDatabase::new();
    let recipe = Uuid::new_v4();
    let rows = seed(&db, recipe, &["a", "b", "c"]).await?;

    let mut reordered = resubmit(&rows);
    reordered.reverse();
    let mut session = db.begin().await?;
    let result = reconcile::sync::<RecipeStep, _>(&mut session, recipe, &reordered).await?;

    assert_eq!(result.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["c", "b", "a"]);
    assert_eq!(result.iter().map(|r| r.step_number).collect::<Vec<_>>(), vec![1, 2, 3]);
    session.commit().await?;
    Ok(())
}
