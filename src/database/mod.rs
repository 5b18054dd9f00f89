pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::{MemoryDatabase, MemorySession};
pub use postgres::{PgDatabase, PgSession};
pub use repository::{list_entities, Page, Repository};
pub use store::{Database, RowValues, Store, WriteInput};
