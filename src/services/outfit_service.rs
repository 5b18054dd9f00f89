use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{NewOutfit, Outfit, OutfitDetail, OutfitItem, OutfitItemInput, OutfitUpdate, ITEM_SCHEMA};
use crate::database::repository::check_references;
use crate::database::{Database, DatabaseError, Page, Repository, Store};
use crate::filter::{ListQuery, PageBounds};
use crate::reconcile::{self, ReconcileError};

#[derive(Debug, Error)]
pub enum OutfitError {
    #[error("Item {0} is listed more than once")]
    DuplicateItem(Uuid),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Outfit writes together with the items worn in them, one transaction each.
#[derive(Clone)]
pub struct OutfitService<D: Database> {
    db: D,
    bounds: PageBounds,
}

impl<D: Database> OutfitService<D> {
    pub fn new(db: D, bounds: PageBounds) -> Self {
        Self { db, bounds }
    }

    fn outfits(&self) -> Repository<Outfit> {
        Repository::new(self.bounds)
    }

    pub async fn list(&self, owner: Uuid, query: &ListQuery) -> Result<Page<Outfit>, OutfitError> {
        let mut session = self.db.begin().await?;
        let page = self.outfits().list(&mut session, query, owner).await?;
        session.commit().await?;
        Ok(page)
    }

    pub async fn get(&self, owner: Uuid, id: Uuid) -> Result<OutfitDetail, OutfitError> {
        let mut session = self.db.begin().await?;
        let outfit = self.outfits().select_404(&mut session, owner, id).await?;
        let items = reconcile::load_existing::<OutfitItem, _>(&mut session, id).await?;
        session.commit().await?;
        Ok(OutfitDetail { outfit, items })
    }

    pub async fn create(&self, owner: Uuid, input: &NewOutfit) -> Result<OutfitDetail, OutfitError> {
        let mut session = self.db.begin().await?;
        check_item_inputs(&mut session, owner, &input.items).await?;

        let outfit = self.outfits().create(&mut session, owner, input).await?;
        let items = reconcile::reconcile::<OutfitItem, _>(&mut session, outfit.id, &[], &input.items).await?;

        session.commit().await?;
        Ok(OutfitDetail { outfit, items })
    }

    /// Patch the outfit; `items`, when present, replaces the worn set.
    pub async fn update(&self, owner: Uuid, id: Uuid, input: &OutfitUpdate) -> Result<OutfitDetail, OutfitError> {
        let mut session = self.db.begin().await?;
        if let Some(items) = &input.items {
            check_item_inputs(&mut session, owner, items).await?;
        }

        let outfit = self.outfits().update(&mut session, owner, id, input).await?;
        let items = match &input.items {
            Some(desired) => reconcile::sync::<OutfitItem, _>(&mut session, id, desired).await?,
            None => reconcile::load_existing::<OutfitItem, _>(&mut session, id).await?,
        };

        session.commit().await?;
        Ok(OutfitDetail { outfit, items })
    }

    pub async fn delete(&self, owner: Uuid, id: Uuid) -> Result<(), OutfitError> {
        let mut session = self.db.begin().await?;
        self.outfits().delete(&mut session, owner, id).await?;
        session.commit().await?;
        Ok(())
    }
}

/// An item appears at most once per outfit and must belong to the caller
async fn check_item_inputs<S: Store>(
    session: &mut S,
    owner: Uuid,
    items: &[OutfitItemInput],
) -> Result<(), OutfitError> {
    let mut seen = HashSet::with_capacity(items.len());
    if let Some(dup) = items.iter().find(|i| !seen.insert(i.item_id)) {
        return Err(OutfitError::DuplicateItem(dup.item_id));
    }
    let references = items.iter().map(|i| (&ITEM_SCHEMA, i.item_id)).collect();
    Ok(check_references(session, owner, references).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Avatar, Item, ItemCategory, NewAvatar, NewItem};
    use crate::database::MemoryDatabase;

    struct Fixture {
        db: MemoryDatabase,
        service: OutfitService<MemoryDatabase>,
        owner: Uuid,
        avatar: Avatar,
    }

    async fn fixture() -> Fixture {
        let db = MemoryDatabase::new();
        let owner = Uuid::new_v4();
        let mut session = db.begin().await.unwrap();
        let avatar = Repository::<Avatar>::new(PageBounds::default())
            .create(&mut session, owner, &NewAvatar { name: "Rusk".into(), store_url: None, thumbnail_url: None })
            .await
            .unwrap();
        session.commit().await.unwrap();
        Fixture { service: OutfitService::new(db.clone(), PageBounds::default()), db, owner, avatar }
    }

    async fn item(db: &MemoryDatabase, owner: Uuid, name: &str) -> Item {
        let mut session = db.begin().await.unwrap();
        let input =
            NewItem { name: name.to_string(), category: ItemCategory::Cloth, store_url: None, thumbnail_url: None };
        let item = Repository::<Item>::new(PageBounds::default())
            .create(&mut session, owner, &input)
            .await
            .unwrap();
        session.commit().await.unwrap();
        item
    }

    fn wear(item: &Item) -> OutfitItemInput {
        OutfitItemInput { id: None, item_id: item.id, description: None }
    }

    fn outfit(avatar: &Avatar, items: Vec<OutfitItemInput>) -> NewOutfit {
        NewOutfit { avatar_id: avatar.id, name: "Casual".into(), description: None, image_url: None, items }
    }

    #[tokio::test]
    async fn create_links_items() {
        let f = fixture().await;
        let shirt = item(&f.db, f.owner, "Shirt").await;
        let boots = item(&f.db, f.owner, "Boots").await;

        let detail = f.service.create(f.owner, &outfit(&f.avatar, vec![wear(&shirt), wear(&boots)])).await.unwrap();
        assert_eq!(detail.items.len(), 2);
        assert!(detail.items.iter().all(|i| i.outfit_id == detail.outfit.id));
        assert_eq!(f.service.get(f.owner, detail.outfit.id).await.unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn update_replaces_items_only_when_sent() {
        let f = fixture().await;
        let shirt = item(&f.db, f.owner, "Shirt").await;
        let boots = item(&f.db, f.owner, "Boots").await;
        let created = f.service.create(f.owner, &outfit(&f.avatar, vec![wear(&shirt)])).await.unwrap();
        let id = created.outfit.id;

        let renamed = OutfitUpdate { name: Some("Weekend".into()), ..Default::default() };
        let detail = f.service.update(f.owner, id, &renamed).await.unwrap();
        assert_eq!(detail.items, created.items);

        let swap = OutfitUpdate { items: Some(vec![wear(&boots)]), ..Default::default() };
        let detail = f.service.update(f.owner, id, &swap).await.unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].item_id, boots.id);
        assert_eq!(detail.outfit.name, "Weekend");
    }

    #[tokio::test]
    async fn duplicate_or_foreign_items_write_nothing() {
        let f = fixture().await;
        let shirt = item(&f.db, f.owner, "Shirt").await;
        let theirs = item(&f.db, Uuid::new_v4(), "Cape").await;

        let err = f.service.create(f.owner, &outfit(&f.avatar, vec![wear(&shirt), wear(&shirt)])).await.unwrap_err();
        assert!(matches!(err, OutfitError::DuplicateItem(id) if id == shirt.id));

        let err = f.service.create(f.owner, &outfit(&f.avatar, vec![wear(&theirs)])).await.unwrap_err();
        assert!(matches!(err, OutfitError::Database(DatabaseError::InvalidReference(_))));
        assert_eq!(f.db.row_count("outfits").await, 0);
    }

    #[tokio::test]
    async fn deleting_an_item_unlinks_it() {
        let f = fixture().await;
        let shirt = item(&f.db, f.owner, "Shirt").await;
        let boots = item(&f.db, f.owner, "Boots").await;
        let created = f.service.create(f.owner, &outfit(&f.avatar, vec![wear(&shirt), wear(&boots)])).await.unwrap();

        let mut session = f.db.begin().await.unwrap();
        Repository::<Item>::new(PageBounds::default()).delete(&mut session, f.owner, shirt.id).await.unwrap();
        session.commit().await.unwrap();

        let detail = f.service.get(f.owner, created.outfit.id).await.unwrap();
        assert_eq!(detail.items.iter().map(|i| i.item_id).collect::<Vec<_>>(), vec![boots.id]);
    }
}
