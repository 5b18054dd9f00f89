//! Child-collection reconciliation.
//!
//! Turns a parent's persisted children into a client-submitted desired list
//! with the minimal set of creates, deletes and updates. Implemented once over
//! [`ChildEntity`] and reused for every nested collection.

pub mod engine;
pub mod plan;

use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::store::RowValues;
use crate::schema::Entity;

pub use engine::{apply, load_existing, reconcile, sync};
pub use plan::{plan, ChildCreate, ChildUpdate, ReconcilePlan};

/// One item of a desired child list
pub trait ChildInput: Clone + Send + Sync + 'static {
    /// Identifier of the persisted child this item describes, if any
    fn id(&self) -> Option<Uuid>;

    /// Column values to write. The id, parent key and position are filled in
    /// by the engine and ignored here.
    fn row_values(&self) -> RowValues;
}

/// A row owned by exactly one parent through its schema's `owner_field`.
pub trait ChildEntity: Entity {
    type Input: ChildInput;

    /// Ordering column rewritten from list position (1-based) on every run
    const POSITION_FIELD: Option<&'static str>;
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Duplicate child id {0} in desired list")]
    DuplicateChildId(Uuid),

    #[error("Child {table} {id} disappeared during reconciliation")]
    ChildVanished { table: &'static str, id: Uuid },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
