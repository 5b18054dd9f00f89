use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Resource;
use crate::database::store::{RowValues, WriteInput};
use crate::filter::{SortDirection, SqlParam};
use crate::schema::{Column, ColumnKind, DefaultSort, Entity, EntitySchema};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "item_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Cloth,
    Hair,
    Accessory,
    Texture,
    Prop,
    Gimmick,
    #[default]
    Other,
}

impl ItemCategory {
    pub const TYPE_NAME: &'static str = "item_category";
    pub const LABELS: &'static [&'static str] =
        &["cloth", "hair", "accessory", "texture", "prop", "gimmick", "other"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Cloth => "cloth",
            ItemCategory::Hair => "hair",
            ItemCategory::Accessory => "accessory",
            ItemCategory::Texture => "texture",
            ItemCategory::Prop => "prop",
            ItemCategory::Gimmick => "gimmick",
            ItemCategory::Other => "other",
        }
    }
}

impl From<ItemCategory> for SqlParam {
    fn from(v: ItemCategory) -> Self {
        SqlParam::Enum {
            type_name: ItemCategory::TYPE_NAME,
            labels: ItemCategory::LABELS,
            label: v.as_str().to_string(),
        }
    }
}

pub static ITEM_SCHEMA: EntitySchema = EntitySchema {
    table: "items",
    id_field: "id",
    owner_field: "user_id",
    columns: &[
        Column::uuid("id"),
        Column::uuid("user_id"),
        Column::text("name"),
        Column::enumeration("category", ItemCategory::TYPE_NAME, ItemCategory::LABELS),
        Column::text("store_url"),
        Column::text("thumbnail_url"),
        Column::timestamp("created_at"),
    ],
    filterable: &["id", "name", "category", "created_at"],
    sortable: &["id", "created_at"],
    default_sort: DefaultSort { field: "created_at", direction: SortDirection::Desc },
    created_field: Some("created_at"),
    updated_field: None,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: ItemCategory,
    pub store_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Item {
    const SCHEMA: &'static EntitySchema = &ITEM_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub category: ItemCategory,
    pub store_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl WriteInput for NewItem {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set("name", self.name.as_str())
            .set("category", self.category)
            .set_opt("store_url", ColumnKind::Text, self.store_url.clone())
            .set_opt("thumbnail_url", ColumnKind::Text, self.thumbnail_url.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub category: Option<ItemCategory>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub store_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub thumbnail_url: Option<Option<String>>,
}

impl WriteInput for ItemUpdate {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set_if("name", self.name.clone())
            .set_if("category", self.category)
            .set_nullable("store_url", ColumnKind::Text, self.store_url.clone())
            .set_nullable("thumbnail_url", ColumnKind::Text, self.thumbnail_url.clone())
    }
}

impl Resource for Item {
    const PATH: &'static str = "items";
    type Create = NewItem;
    type Update = ItemUpdate;
}
