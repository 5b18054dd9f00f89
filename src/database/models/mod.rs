pub mod asset;
pub mod avatar;
pub mod compatibility;
pub mod item;
pub mod outfit;
pub mod recipe;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::database::store::{RowValues, WriteInput};
use crate::filter::SqlParam;
use crate::schema::{Entity, EntitySchema};

pub use asset::{Asset, AssetCategory, AssetUpdate, NewAsset, ASSET_SCHEMA};
pub use avatar::{Avatar, AvatarUpdate, NewAvatar, AVATAR_SCHEMA};
pub use compatibility::{
    Compatibility, CompatibilityStatus, CompatibilityUpdate, CompatibilityUpsert, Matrix, COMPATIBILITY_SCHEMA,
};
pub use item::{Item, ItemCategory, ItemUpdate, NewItem, ITEM_SCHEMA};
pub use outfit::{
    NewOutfit, Outfit, OutfitDetail, OutfitItem, OutfitItemInput, OutfitUpdate, OUTFIT_ITEM_SCHEMA, OUTFIT_SCHEMA,
};
pub use recipe::{
    NewRecipe, Recipe, RecipeAsset, RecipeAssetInput, RecipeDetail, RecipeState, RecipeStep, RecipeUpdate,
    StepInput, RECIPE_ASSET_SCHEMA, RECIPE_SCHEMA, RECIPE_STEP_SCHEMA,
};

/// Top-level, user-owned entity served by the generic CRUD endpoints.
pub trait Resource: Entity {
    /// Path segment under `/api`
    const PATH: &'static str;
    type Create: WriteInput + DeserializeOwned + Send + Sync + 'static;
    type Update: WriteInput + DeserializeOwned + Send + Sync + 'static;

    /// Rows in other user-owned tables this write points at. Each must belong
    /// to the same user.
    fn references(_values: &RowValues) -> Vec<(&'static EntitySchema, Uuid)> {
        vec![]
    }
}

impl Resource for Recipe {
    const PATH: &'static str = "recipes";
    type Create = NewRecipe;
    type Update = RecipeUpdate;

    fn references(values: &RowValues) -> Vec<(&'static EntitySchema, Uuid)> {
        match values.get("base_asset_id") {
            Some(SqlParam::Uuid(id)) => vec![(&ASSET_SCHEMA, *id)],
            _ => vec![],
        }
    }
}

/// Foreign keys declared `ON DELETE CASCADE`: parent table, child, child column
pub static CASCADES: &[(&str, &EntitySchema, &str)] = &[
    ("avatars", &OUTFIT_SCHEMA, "avatar_id"),
    ("avatars", &COMPATIBILITY_SCHEMA, "avatar_id"),
    ("items", &OUTFIT_ITEM_SCHEMA, "item_id"),
    ("items", &COMPATIBILITY_SCHEMA, "item_id"),
    ("outfits", &OUTFIT_ITEM_SCHEMA, "outfit_id"),
    ("assets", &RECIPE_SCHEMA, "base_asset_id"),
    ("assets", &RECIPE_ASSET_SCHEMA, "asset_id"),
    ("recipes", &RECIPE_STEP_SCHEMA, "recipe_id"),
    ("recipes", &RECIPE_ASSET_SCHEMA, "recipe_id"),
];

/// Every registered schema, top-level and child
pub fn registry() -> [&'static EntitySchema; 9] {
    [
        &AVATAR_SCHEMA,
        &ITEM_SCHEMA,
        &ASSET_SCHEMA,
        &OUTFIT_SCHEMA,
        &OUTFIT_ITEM_SCHEMA,
        &COMPATIBILITY_SCHEMA,
        &RECIPE_SCHEMA,
        &RECIPE_STEP_SCHEMA,
        &RECIPE_ASSET_SCHEMA,
    ]
}
