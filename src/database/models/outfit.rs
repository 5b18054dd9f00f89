use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::avatar::AVATAR_SCHEMA;
use super::Resource;
use crate::database::store::{RowValues, WriteInput};
use crate::filter::{SortDirection, SqlParam};
use crate::reconcile::{ChildEntity, ChildInput};
use crate::schema::{Column, ColumnKind, DefaultSort, Entity, EntitySchema};

pub static OUTFIT_SCHEMA: EntitySchema = EntitySchema {
    table: "outfits",
    id_field: "id",
    owner_field: "user_id",
    columns: &[
        Column::uuid("id"),
        Column::uuid("user_id"),
        Column::uuid("avatar_id"),
        Column::text("name"),
        Column::text("description"),
        Column::text("image_url"),
        Column::timestamp("created_at"),
    ],
    filterable: &["id", "avatar_id", "name", "created_at"],
    sortable: &["id", "created_at"],
    default_sort: DefaultSort { field: "created_at", direction: SortDirection::Desc },
    created_field: Some("created_at"),
    updated_field: None,
};

/// Items worn in an outfit, scoped by the outfit
pub static OUTFIT_ITEM_SCHEMA: EntitySchema = EntitySchema {
    table: "outfit_items",
    id_field: "id",
    owner_field: "outfit_id",
    columns: &[
        Column::uuid("id"),
        Column::uuid("outfit_id"),
        Column::uuid("item_id"),
        Column::text("description"),
    ],
    filterable: &["id", "item_id"],
    sortable: &["id"],
    default_sort: DefaultSort { field: "id", direction: SortDirection::Asc },
    created_field: None,
    updated_field: None,
};

/// A saved combination worn on one avatar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Outfit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub avatar_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Outfit {
    const SCHEMA: &'static EntitySchema = &OUTFIT_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OutfitItem {
    pub id: Uuid,
    pub outfit_id: Uuid,
    pub item_id: Uuid,
    pub description: Option<String>,
}

impl Entity for OutfitItem {
    const SCHEMA: &'static EntitySchema = &OUTFIT_ITEM_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl ChildEntity for OutfitItem {
    type Input = OutfitItemInput;
    const POSITION_FIELD: Option<&'static str> = None;
}

/// Desired state of one worn item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitItemInput {
    pub id: Option<Uuid>,
    pub item_id: Uuid,
    pub description: Option<String>,
}

impl ChildInput for OutfitItemInput {
    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set("item_id", self.item_id)
            .set_opt("description", ColumnKind::Text, self.description.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOutfit {
    pub avatar_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub items: Vec<OutfitItemInput>,
}

impl WriteInput for NewOutfit {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set("avatar_id", self.avatar_id)
            .set("name", self.name.as_str())
            .set_opt("description", ColumnKind::Text, self.description.clone())
            .set_opt("image_url", ColumnKind::Text, self.image_url.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutfitUpdate {
    pub avatar_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::types::double_option")]
    pub image_url: Option<Option<String>>,
    /// Replaces the worn items when present
    pub items: Option<Vec<OutfitItemInput>>,
}

impl WriteInput for OutfitUpdate {
    fn row_values(&self) -> RowValues {
        RowValues::new()
            .set_if("avatar_id", self.avatar_id)
            .set_if("name", self.name.clone())
            .set_nullable("description", ColumnKind::Text, self.description.clone())
            .set_nullable("image_url", ColumnKind::Text, self.image_url.clone())
    }
}

impl Resource for Outfit {
    const PATH: &'static str = "outfits";
    type Create = NewOutfit;
    type Update = OutfitUpdate;

    fn references(values: &RowValues) -> Vec<(&'static EntitySchema, Uuid)> {
        match values.get("avatar_id") {
            Some(SqlParam::Uuid(id)) => vec![(&AVATAR_SCHEMA, *id)],
            _ => vec![],
        }
    }
}

/// Outfit with the items worn in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitDetail {
    #[serde(flatten)]
    pub outfit: Outfit,
    pub items: Vec<OutfitItem>,
}
