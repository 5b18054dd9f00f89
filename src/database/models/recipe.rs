use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::asset::Asset;
use crate::database::store::{RowValues, WriteInput};
use crate::filter::{SortDirection, SqlParam};
use crate::reconcile::{ChildEntity, ChildInput};
use crate::schema::{Column, ColumnKind, DefaultSort, Entity, EntitySchema};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recipe_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecipeState {
    #[default]
    Private,
    Public,
    Unlisted,
}

impl RecipeState {
    pub const TYPE_NAME: &'static str = "recipe_state";
    pub const LABELS: &'static [&'static str] = &["private", "public", "unlisted"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeState::Private => "private",
            RecipeState::Public => "public",
            RecipeState::Unlisted => "unlisted",
        }
    }
}

impl From<RecipeState> for SqlParam {
    fn from(v: RecipeState) -> Self {
        SqlParam::Enum {
            type_name: RecipeState::TYPE_NAME,
            labels: RecipeState::LABELS,
            label: v.as_str().to_string(),
        }
    }
}

pub static RECIPE_SCHEMA: EntitySchema = EntitySchema {
    table: "recipes",
    id_field: "id",
    owner_field: "user_id",
    columns: &[
        Column::uuid("id"),
        Column::uuid("user_id"),
        Column::text("name"),
        Column::text("description"),
        Column::text("image_url"),
        Column::enumeration("state", RecipeState::TYPE_NAME, RecipeState::LABELS),
        Column::uuid("base_asset_id"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ],
    filterable: &["id", "state", "base_asset_id", "created_at"],
    sortable: &["id", "created_at"],
    default_sort: DefaultSort { field: "created_at", direction: SortDirection::Desc },
    created_field: Some("created_at"),
    updated_field: Some("updated_at"),
};

/// Steps are scoped by their recipe, not by user
pub static RECIPE_STEP_SCHEMA: EntitySchema = EntitySchema {
    table: "recipe_steps",
    id_field: "id",
    owner_field: "recipe_id",
    columns: &[
        Column::uuid("id"),
        Column::uuid("recipe_id"),
        Column::integer("step_number"),
        Column::text("name"),
        Column::text("description"),
        Column::text("image_url"),
    ],
    filterable: &["id"],
    sortable: &["id", "step_number"],
    default_sort: DefaultSort { field: "step_number", direction: SortDirection::Asc },
    created_field: None,
    updated_field: None,
};

pub static RECIPE_ASSET_SCHEMA: EntitySchema = EntitySchema {
    table: "recipe_assets",
    id_field: "id",
    owner_field: "recipe_id",
    columns: &[
        Column::uuid("id"),
        Column::uuid("recipe_id"),
        Column::uuid("asset_id"),
        Column::text("note"),
        Column::json("configuration"),
    ],
    filterable: &["id", "asset_id"],
    sortable: &["id"],
    default_sort: DefaultSort { field: "id", direction: SortDirection::Asc },
    created_field: None,
    updated_field: None,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub state: RecipeState,
    pub base_asset_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Recipe {
    const SCHEMA: &'static EntitySchema = &RECIPE_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecipeStep {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub step_number: i32,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
}

impl Entity for RecipeStep {
    const SCHEMA: &'static EntitySchema = &RECIPE_STEP_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl ChildEntity for RecipeStep {
    type Input = StepInput;
    const POSITION_FIELD: Option<&'static str> = Some("step_number");
}

/// Material asset referenced by a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecipeAsset {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub asset_id: Uuid,
    pub note: Option<String>,
    pub configuration: Option<Value>,
}

impl Entity for RecipeAsset {
    const SCHEMA: &'static EntitySchema = &RECIPE_ASSET_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl ChildEntity for RecipeAsset {
    type Input = RecipeAssetInput;
    const POSITION_FIELD: Option<&'static str> = None;
}

/// Desired state of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInput {
    pub id: Option<Uuid>,
    /// Accepted but ignored; numbering follows list order
    #[serde(default)]
    pub step_number: Option<i32>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
}

impl ChildInput for StepInput {
    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set("name", self.name.as_str())
            .set("description", self.description.as_str())
            .set_opt("image_url", ColumnKind::Text, self.image_url.clone())
    }
}

/// Desired state of one material reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeAssetInput {
    pub id: Option<Uuid>,
    pub asset_id: Uuid,
    pub note: Option<String>,
    pub configuration: Option<Value>,
}

impl ChildInput for RecipeAssetInput {
    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set("asset_id", self.asset_id)
            .set_opt("note", ColumnKind::Text, self.note.clone())
            .set_opt("configuration", ColumnKind::Json, self.configuration.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub state: RecipeState,
    pub image_url: Option<String>,
    pub base_asset_id: Option<Uuid>,
    #[serde(default)]
    pub steps: Vec<StepInput>,
    #[serde(default)]
    pub assets: Vec<RecipeAssetInput>,
}

impl WriteInput for NewRecipe {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set("name", self.name.as_str())
            .set_opt("description", ColumnKind::Text, self.description.clone())
            .set("state", self.state)
            .set_opt("image_url", ColumnKind::Text, self.image_url.clone())
            .set_opt("base_asset_id", ColumnKind::Uuid, self.base_asset_id)
    }
}

/// Partial recipe update. A nested list that is present replaces the whole
/// collection; an absent one leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub description: Option<Option<String>>,
    pub state: Option<RecipeState>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub base_asset_id: Option<Option<Uuid>>,
    pub steps: Option<Vec<StepInput>>,
    pub assets: Option<Vec<RecipeAssetInput>>,
}

impl WriteInput for RecipeUpdate {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set_if("name", self.name.clone())
            .set_nullable("description", ColumnKind::Text, self.description.clone())
            .set_if("state", self.state)
            .set_nullable("image_url", ColumnKind::Text, self.image_url.clone())
            .set_nullable("base_asset_id", ColumnKind::Uuid, self.base_asset_id)
    }
}

/// Recipe with its children, as returned by the recipe endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub base_asset: Option<Asset>,
    pub steps: Vec<RecipeStep>,
    pub assets: Vec<RecipeAsset>,
}
