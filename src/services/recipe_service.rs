use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{
    Asset, NewRecipe, Recipe, RecipeAsset, RecipeAssetInput, RecipeDetail, RecipeStep, RecipeUpdate, ASSET_SCHEMA,
};
use crate::database::repository::check_references;
use crate::database::{Database, DatabaseError, Page, Repository, Store};
use crate::filter::{ListQuery, PageBounds};
use crate::reconcile::{self, ReconcileError};

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Recipe writes with nested steps and material assets. Every operation runs
/// in a single transaction; a failure anywhere leaves nothing behind.
#[derive(Clone)]
pub struct RecipeService<D: Database> {
    db: D,
    bounds: PageBounds,
}

impl<D: Database> RecipeService<D> {
    pub fn new(db: D, bounds: PageBounds) -> Self {
        Self { db, bounds }
    }

    fn recipes(&self) -> Repository<Recipe> {
        Repository::new(self.bounds)
    }

    pub async fn list(&self, owner: Uuid, query: &ListQuery) -> Result<Page<Recipe>, RecipeError> {
        let mut session = self.db.begin().await?;
        let page = self.recipes().list(&mut session, query, owner).await?;
        session.commit().await?;
        Ok(page)
    }

    pub async fn get(&self, owner: Uuid, id: Uuid) -> Result<RecipeDetail, RecipeError> {
        let mut session = self.db.begin().await?;
        let recipe = self.recipes().select_404(&mut session, owner, id).await?;
        let steps = reconcile::load_existing::<RecipeStep, _>(&mut session, id).await?;
        let assets = reconcile::load_existing::<RecipeAsset, _>(&mut session, id).await?;
        let detail = self.detail(&mut session, recipe, steps, assets).await?;
        session.commit().await?;
        Ok(detail)
    }

    pub async fn create(&self, owner: Uuid, input: &NewRecipe) -> Result<RecipeDetail, RecipeError> {
        let mut session = self.db.begin().await?;
        check_asset_inputs(&mut session, owner, &input.assets).await?;

        let recipe = self.recipes().create(&mut session, owner, input).await?;
        let steps = reconcile::reconcile::<RecipeStep, _>(&mut session, recipe.id, &[], &input.steps).await?;
        let assets = reconcile::reconcile::<RecipeAsset, _>(&mut session, recipe.id, &[], &input.assets).await?;

        let detail = self.detail(&mut session, recipe, steps, assets).await?;
        session.commit().await?;
        Ok(detail)
    }

    /// Patch the recipe row, then replace each nested collection that is
    /// present in `input`. Absent collections are re-read unchanged.
    pub async fn update(&self, owner: Uuid, id: Uuid, input: &RecipeUpdate) -> Result<RecipeDetail, RecipeError> {
        let mut session = self.db.begin().await?;
        if let Some(assets) = &input.assets {
            check_asset_inputs(&mut session, owner, assets).await?;
        }

        let recipe = self.recipes().update(&mut session, owner, id, input).await?;

        let steps = match &input.steps {
            Some(desired) => reconcile::sync::<RecipeStep, _>(&mut session, id, desired).await?,
            None => reconcile::load_existing::<RecipeStep, _>(&mut session, id).await?,
        };
        let assets = match &input.assets {
            Some(desired) => reconcile::sync::<RecipeAsset, _>(&mut session, id, desired).await?,
            None => reconcile::load_existing::<RecipeAsset, _>(&mut session, id).await?,
        };

        let detail = self.detail(&mut session, recipe, steps, assets).await?;
        session.commit().await?;
        Ok(detail)
    }

    pub async fn delete(&self, owner: Uuid, id: Uuid) -> Result<(), RecipeError> {
        let mut session = self.db.begin().await?;
        self.recipes().delete(&mut session, owner, id).await?;
        session.commit().await?;
        Ok(())
    }

    async fn detail(
        &self,
        session: &mut D::Session,
        recipe: Recipe,
        steps: Vec<RecipeStep>,
        assets: Vec<RecipeAsset>,
    ) -> Result<RecipeDetail, RecipeError> {
        let base_asset = match recipe.base_asset_id {
            Some(asset_id) => {
                Repository::<Asset>::new(self.bounds)
                    .select_one(session, recipe.user_id, asset_id)
                    .await?
            }
            None => None,
        };
        Ok(RecipeDetail { recipe, base_asset, steps, assets })
    }
}

/// Material rows may only point at the caller's own assets
async fn check_asset_inputs<S: Store>(
    session: &mut S,
    owner: Uuid,
    assets: &[RecipeAssetInput],
) -> Result<(), DatabaseError> {
    let references = assets.iter().map(|a| (&ASSET_SCHEMA, a.asset_id)).collect();
    check_references(session, owner, references).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{AssetCategory, NewAsset, StepInput};
    use crate::database::MemoryDatabase;

    fn service() -> (MemoryDatabase, RecipeService<MemoryDatabase>) {
        let db = MemoryDatabase::new();
        (db.clone(), RecipeService::new(db, PageBounds::default()))
    }

    fn step(id: Option<Uuid>, name: &str) -> StepInput {
        StepInput { id, step_number: None, name: name.to_string(), description: String::new(), image_url: None }
    }

    fn recipe(name: &str) -> NewRecipe {
        NewRecipe {
            name: name.to_string(),
            description: None,
            state: Default::default(),
            image_url: None,
            base_asset_id: None,
            steps: vec![],
            assets: vec![],
        }
    }

    async fn asset(db: &MemoryDatabase, owner: Uuid, name: &str) -> Asset {
        let mut session = db.begin().await.unwrap();
        let input = NewAsset {
            name: name.to_string(),
            description: None,
            category: AssetCategory::Texture,
            store_url: None,
            source_key: None,
            image_url: None,
        };
        let asset = Repository::<Asset>::new(PageBounds::default())
            .create(&mut session, owner, &input)
            .await
            .unwrap();
        session.commit().await.unwrap();
        asset
    }

    #[tokio::test]
    async fn create_writes_children_and_base_asset() {
        let (db, service) = service();
        let owner = Uuid::new_v4();
        let base = asset(&db, owner, "Denim").await;

        let input = NewRecipe {
            base_asset_id: Some(base.id),
            steps: vec![step(None, "Cut"), step(None, "Sew")],
            assets: vec![RecipeAssetInput { id: None, asset_id: base.id, note: Some("main".into()), configuration: None }],
            ..recipe("Jacket")
        };
        let detail = service.create(owner, &input).await.unwrap();

        assert_eq!(detail.base_asset.as_ref().map(|a| a.id), Some(base.id));
        assert_eq!(detail.steps.iter().map(|s| s.step_number).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(detail.assets.len(), 1);
        assert_eq!(service.get(owner, detail.recipe.id).await.unwrap(), detail);
    }

    #[tokio::test]
    async fn update_leaves_absent_collections_alone() {
        let (_, service) = service();
        let owner = Uuid::new_v4();
        let created = service
            .create(owner, &NewRecipe { steps: vec![step(None, "s1"), step(None, "s2")], ..recipe("Scarf") })
            .await
            .unwrap();

        let patch = RecipeUpdate { name: Some("Long scarf".into()), ..Default::default() };
        let updated = service.update(owner, created.recipe.id, &patch).await.unwrap();
        assert_eq!(updated.recipe.name, "Long scarf");
        assert_eq!(updated.steps, created.steps);

        let patch = RecipeUpdate { steps: Some(vec![]), ..Default::default() };
        let emptied = service.update(owner, created.recipe.id, &patch).await.unwrap();
        assert!(emptied.steps.is_empty());
    }

    #[tokio::test]
    async fn foreign_asset_rolls_back_whole_create() {
        let (db, service) = service();
        let owner = Uuid::new_v4();
        let theirs = asset(&db, Uuid::new_v4(), "Silk").await;

        let input = NewRecipe {
            steps: vec![step(None, "Cut")],
            assets: vec![RecipeAssetInput { id: None, asset_id: theirs.id, note: None, configuration: None }],
            ..recipe("Blouse")
        };
        let err = service.create(owner, &input).await.unwrap_err();
        assert!(matches!(err, RecipeError::Database(DatabaseError::InvalidReference(_))));
        assert_eq!(db.row_count("recipes").await, 0);
        assert_eq!(db.row_count("recipe_steps").await, 0);
    }

    #[tokio::test]
    async fn other_owners_cannot_touch_recipe() {
        let (_, service) = service();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let created = service.create(owner, &recipe("Hat")).await.unwrap();
        let id = created.recipe.id;

        assert!(matches!(service.get(intruder, id).await, Err(RecipeError::Database(DatabaseError::NotFound(_)))));
        assert!(matches!(
            service.update(intruder, id, &RecipeUpdate::default()).await,
            Err(RecipeError::Database(DatabaseError::NotFound(_)))
        ));
        assert!(service.delete(intruder, id).await.is_err());
        service.delete(owner, id).await.unwrap();
        assert!(service.get(owner, id).await.is_err());
    }

    #[tokio::test]
    async fn failed_step_sync_keeps_parent_unchanged() {
        let (_, service) = service();
        let owner = Uuid::new_v4();
        let created = service
            .create(owner, &NewRecipe { steps: vec![step(None, "a")], ..recipe("Vest") })
            .await
            .unwrap();
        let dup = created.steps[0].id;

        let patch = RecipeUpdate {
            name: Some("Renamed".into()),
            steps: Some(vec![step(Some(dup), "x"), step(Some(dup), "y")]),
            ..Default::default()
        };
        let err = service.update(owner, created.recipe.id, &patch).await.unwrap_err();
        assert!(matches!(err, RecipeError::Reconcile(ReconcileError::DuplicateChildId(_))));

        let after = service.get(owner, created.recipe.id).await.unwrap();
        assert_eq!(after.recipe.name, "Vest");
        assert_eq!(after.steps, created.steps);
    }
}
