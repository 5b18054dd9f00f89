use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::avatar::{Avatar, AVATAR_SCHEMA};
use super::item::{Item, ITEM_SCHEMA};
use crate::database::store::{RowValues, WriteInput};
use crate::filter::{SortDirection, SqlParam};
use crate::schema::{Column, ColumnKind, DefaultSort, Entity, EntitySchema};

/// How well an item fits an avatar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "compatibility_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityStatus {
    Official,
    Modified,
    #[default]
    Unsupported,
}

impl CompatibilityStatus {
    pub const TYPE_NAME: &'static str = "compatibility_status";
    pub const LABELS: &'static [&'static str] = &["official", "modified", "unsupported"];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityStatus::Official => "official",
            CompatibilityStatus::Modified => "modified",
            CompatibilityStatus::Unsupported => "unsupported",
        }
    }
}

impl From<CompatibilityStatus> for SqlParam {
    fn from(v: CompatibilityStatus) -> Self {
        SqlParam::Enum {
            type_name: CompatibilityStatus::TYPE_NAME,
            labels: CompatibilityStatus::LABELS,
            label: v.as_str().to_string(),
        }
    }
}

pub static COMPATIBILITY_SCHEMA: EntitySchema = EntitySchema {
    table: "compatibility",
    id_field: "id",
    owner_field: "user_id",
    columns: &[
        Column::uuid("id"),
        Column::uuid("user_id"),
        Column::uuid("avatar_id"),
        Column::uuid("item_id"),
        Column::enumeration("status", CompatibilityStatus::TYPE_NAME, CompatibilityStatus::LABELS),
        Column::text("note"),
        Column::timestamp("updated_at"),
    ],
    filterable: &["id", "avatar_id", "item_id", "status", "updated_at"],
    sortable: &["id", "updated_at"],
    default_sort: DefaultSort { field: "id", direction: SortDirection::Asc },
    created_field: None,
    updated_field: Some("updated_at"),
};

/// One avatar/item cell of the matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Compatibility {
    pub id: Uuid,
    pub user_id: Uuid,
    pub avatar_id: Uuid,
    pub item_id: Uuid,
    pub status: CompatibilityStatus,
    pub note: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Compatibility {
    const SCHEMA: &'static EntitySchema = &COMPATIBILITY_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// POST /api/compatibility body: create the cell or overwrite its status
#[derive(Debug, Clone, Deserialize)]
pub struct CompatibilityUpsert {
    pub avatar_id: Uuid,
    pub item_id: Uuid,
    pub status: CompatibilityStatus,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub note: Option<Option<String>>,
}

impl CompatibilityUpsert {
    pub fn references(&self) -> Vec<(&'static EntitySchema, Uuid)> {
        vec![(&AVATAR_SCHEMA, self.avatar_id), (&ITEM_SCHEMA, self.item_id)]
    }

    pub fn patch(&self) -> CompatibilityUpdate {
        CompatibilityUpdate { status: self.status, note: self.note.clone() }
    }
}

impl WriteInput for CompatibilityUpsert {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set("avatar_id", self.avatar_id)
            .set("item_id", self.item_id)
            .set("status", self.status)
            .set_opt("note", ColumnKind::Text, self.note.clone().flatten())
    }
}

/// PUT /api/compatibility/:avatar_id/:item_id body
#[derive(Debug, Clone, Deserialize)]
pub struct CompatibilityUpdate {
    pub status: CompatibilityStatus,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub note: Option<Option<String>>,
}

impl WriteInput for CompatibilityUpdate {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set("status", self.status)
            .set_nullable("note", ColumnKind::Text, self.note.clone())
    }
}

/// One window of both matrix axes plus the cells recorded between them.
/// The totals give each axis's full size so clients can page further.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub avatars: Vec<Avatar>,
    pub items: Vec<Item>,
    pub compatibilities: Vec<Compatibility>,
    pub total_avatars: i64,
    pub total_items: i64,
}
