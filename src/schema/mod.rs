//! Column whitelist registry.
//!
//! Every queryable entity declares one static [`EntitySchema`]: its table, its
//! identifier and owner-scoping columns, a typed column catalog, and the
//! subsets of that catalog clients may filter or sort on. The registry is the
//! only path by which a client-supplied field name can become a column
//! reference in generated SQL.

use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use crate::filter::types::SortDirection;

/// Storage type of a column, used to coerce client values and bind parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Integer,
    Float,
    Bool,
    Timestamp,
    /// Postgres enum type with its accepted labels
    Enum {
        type_name: &'static str,
        labels: &'static [&'static str],
    },
    Json,
}

impl ColumnKind {
    /// Json columns hold documents and have no meaningful equality or order
    pub fn is_comparable(&self) -> bool {
        !matches!(self, ColumnKind::Json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn uuid(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Uuid }
    }

    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Text }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Integer }
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Timestamp }
    }

    pub const fn json(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Json }
    }

    pub const fn enumeration(
        name: &'static str,
        type_name: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self { name, kind: ColumnKind::Enum { type_name, labels } }
    }

    /// Double-quoted SQL identifier
    pub fn quoted(&self) -> String {
        quote_identifier(self.name)
    }
}

/// Default ordering used when a client sort key is absent or not whitelisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultSort {
    pub field: &'static str,
    pub direction: SortDirection,
}

/// Static per-entity declaration of table shape and query whitelists.
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySchema {
    pub table: &'static str,
    /// Primary key, always a uuid column
    pub id_field: &'static str,
    /// Column every read and write is scoped by. For top-level resources this
    /// is the owning account; for child rows it is the parent foreign key.
    pub owner_field: &'static str,
    pub columns: &'static [Column],
    pub filterable: &'static [&'static str],
    pub sortable: &'static [&'static str],
    pub default_sort: DefaultSort,
    /// Filled with the current time on insert
    pub created_field: Option<&'static str>,
    /// Filled with the current time on every update
    pub updated_field: Option<&'static str>,
}

impl EntitySchema {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn filterable_column(&self, name: &str) -> Option<&'static Column> {
        if !self.filterable.contains(&name) {
            return None;
        }
        self.column(name).filter(|c| c.kind.is_comparable())
    }

    pub fn sortable_column(&self, name: &str) -> Option<&'static Column> {
        if !self.sortable.contains(&name) {
            return None;
        }
        self.column(name).filter(|c| c.kind.is_comparable())
    }

    pub fn id_column(&self) -> Column {
        Column::uuid(self.id_field)
    }

    pub fn owner_column(&self) -> Column {
        Column::uuid(self.owner_field)
    }

    pub fn quoted_table(&self) -> String {
        quote_identifier(self.table)
    }

    /// Check the declaration is internally consistent. Registered schemas are
    /// verified by unit tests so a bad whitelist never reaches a running server.
    pub fn validate(&self) -> Result<(), String> {
        for required in [self.id_field, self.owner_field] {
            match self.column(required) {
                Some(c) if c.kind == ColumnKind::Uuid => {}
                Some(_) => return Err(format!("{}.{} must be a uuid column", self.table, required)),
                None => return Err(format!("{}.{} missing from column catalog", self.table, required)),
            }
        }
        for name in self.filterable {
            if self.filterable_column(name).is_none() {
                return Err(format!("{}.{} is not a comparable catalog column", self.table, name));
            }
        }
        for name in self.sortable {
            if self.sortable_column(name).is_none() {
                return Err(format!("{}.{} is not a comparable catalog column", self.table, name));
            }
        }
        if self.sortable_column(self.default_sort.field).is_none() {
            return Err(format!("{} default sort '{}' is not sortable", self.table, self.default_sort.field));
        }
        for stamp in [self.created_field, self.updated_field].into_iter().flatten() {
            if !matches!(self.column(stamp), Some(c) if c.kind == ColumnKind::Timestamp) {
                return Err(format!("{}.{} must be a timestamp column", self.table, stamp));
            }
        }
        Ok(())
    }
}

/// A database-backed row type with a static whitelist declaration.
pub trait Entity:
    for<'r> FromRow<'r, PgRow> + Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static
{
    const SCHEMA: &'static EntitySchema;

    fn id(&self) -> Uuid;
}

/// Quote SQL identifier to prevent injection
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    static WIDGETS: EntitySchema = EntitySchema {
        table: "widgets",
        id_field: "id",
        owner_field: "user_id",
        columns: &[
            Column::uuid("id"),
            Column::uuid("user_id"),
            Column::text("name"),
            Column::json("settings"),
            Column::timestamp("created_at"),
        ],
        filterable: &["id", "name", "settings"],
        sortable: &["id", "created_at"],
        default_sort: DefaultSort { field: "created_at", direction: SortDirection::Desc },
        created_field: Some("created_at"),
        updated_field: None,
    };

    #[test]
    fn whitelist_lookup_requires_declaration() {
        assert!(WIDGETS.filterable_column("name").is_some());
        assert!(WIDGETS.filterable_column("created_at").is_none());
        assert!(WIDGETS.sortable_column("name").is_none());
        assert!(WIDGETS.sortable_column("created_at").is_some());
    }

    #[test]
    fn json_columns_are_never_queryable() {
        assert!(WIDGETS.filterable_column("settings").is_none());
        assert!(WIDGETS.validate().unwrap_err().contains("settings"));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("name"), "\"name\"");
        assert_eq!(quote_identifier("na\"me"), "\"na\"\"me\"");
    }
}
