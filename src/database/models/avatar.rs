use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Resource;
use crate::database::store::{RowValues, WriteInput};
use crate::filter::SortDirection;
use crate::schema::{Column, ColumnKind, DefaultSort, Entity, EntitySchema};

pub static AVATAR_SCHEMA: EntitySchema = EntitySchema {
    table: "avatars",
    id_field: "id",
    owner_field: "user_id",
    columns: &[
        Column::uuid("id"),
        Column::uuid("user_id"),
        Column::text("name"),
        Column::text("store_url"),
        Column::text("thumbnail_url"),
        Column::timestamp("created_at"),
    ],
    filterable: &["id", "name", "created_at"],
    sortable: &["id", "created_at"],
    default_sort: DefaultSort { field: "created_at", direction: SortDirection::Desc },
    created_field: Some("created_at"),
    updated_field: None,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Avatar {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub store_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Avatar {
    const SCHEMA: &'static EntitySchema = &AVATAR_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAvatar {
    pub name: String,
    pub store_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl WriteInput for NewAvatar {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set("name", self.name.as_str())
            .set_opt("store_url", ColumnKind::Text, self.store_url.clone())
            .set_opt("thumbnail_url", ColumnKind::Text, self.thumbnail_url.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvatarUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub store_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub thumbnail_url: Option<Option<String>>,
}

impl WriteInput for AvatarUpdate {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set_if("name", self.name.clone())
            .set_nullable("store_url", ColumnKind::Text, self.store_url.clone())
            .set_nullable("thumbnail_url", ColumnKind::Text, self.thumbnail_url.clone())
    }
}

impl Resource for Avatar {
    const PATH: &'static str = "avatars";
    type Create = NewAvatar;
    type Update = AvatarUpdate;
}
