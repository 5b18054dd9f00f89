use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Resource;
use crate::database::store::{RowValues, WriteInput};
use crate::filter::{SortDirection, SqlParam};
use crate::schema::{Column, ColumnKind, DefaultSort, Entity, EntitySchema};

/// Kind of storefront asset a user has registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "asset_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Avatar,
    Cloth,
    Hair,
    Accessory,
    Texture,
    Prop,
    Gimmick,
    #[default]
    Other,
}

impl AssetCategory {
    pub const TYPE_NAME: &'static str = "asset_category";
    pub const LABELS: &'static [&'static str] =
        &["avatar", "cloth", "hair", "accessory", "texture", "prop", "gimmick", "other"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Avatar => "avatar",
            AssetCategory::Cloth => "cloth",
            AssetCategory::Hair => "hair",
            AssetCategory::Accessory => "accessory",
            AssetCategory::Texture => "texture",
            AssetCategory::Prop => "prop",
            AssetCategory::Gimmick => "gimmick",
            AssetCategory::Other => "other",
        }
    }
}

impl From<AssetCategory> for SqlParam {
    fn from(v: AssetCategory) -> Self {
        SqlParam::Enum {
            type_name: AssetCategory::TYPE_NAME,
            labels: AssetCategory::LABELS,
            label: v.as_str().to_string(),
        }
    }
}

pub static ASSET_SCHEMA: EntitySchema = EntitySchema {
    table: "assets",
    id_field: "id",
    owner_field: "user_id",
    columns: &[
        Column::uuid("id"),
        Column::uuid("user_id"),
        Column::text("name"),
        Column::text("description"),
        Column::enumeration("category", AssetCategory::TYPE_NAME, AssetCategory::LABELS),
        Column::text("store_url"),
        Column::text("source_key"),
        Column::text("image_url"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ],
    filterable: &["id", "name", "category", "created_at"],
    sortable: &["id", "created_at"],
    default_sort: DefaultSort { field: "created_at", direction: SortDirection::Desc },
    created_field: Some("created_at"),
    updated_field: Some("updated_at"),
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: AssetCategory,
    pub store_url: Option<String>,
    /// `<store>:<external id>`, unique per user
    pub source_key: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Asset {
    const SCHEMA: &'static EntitySchema = &ASSET_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAsset {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub category: AssetCategory,
    pub store_url: Option<String>,
    pub source_key: Option<String>,
    pub image_url: Option<String>,
}

impl WriteInput for NewAsset {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set("name", self.name.as_str())
            .set_opt("description", ColumnKind::Text, self.description.clone())
            .set("category", self.category)
            .set_opt("store_url", ColumnKind::Text, self.store_url.clone())
            .set_opt("source_key", ColumnKind::Text, self.source_key.clone())
            .set_opt("image_url", ColumnKind::Text, self.image_url.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub description: Option<Option<String>>,
    pub category: Option<AssetCategory>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub store_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub source_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub image_url: Option<Option<String>>,
}

impl WriteInput for AssetUpdate {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set_if("name", self.name.clone())
            .set_nullable("description", ColumnKind::Text, self.description.clone())
            .set_if("category", self.category)
            .set_nullable("store_url", ColumnKind::Text, self.store_url.clone())
            .set_nullable("source_key", ColumnKind::Text, self.source_key.clone())
            .set_nullable("image_url", ColumnKind::Text, self.image_url.clone())
    }
}

impl Resource for Asset {
    const PATH: &'static str = "assets";
    type Create = NewAsset;
    type Update = AssetUpdate;
}
