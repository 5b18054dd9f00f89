//! Query translation layer: whitelisted predicates, orderings and page
//! windows composed into one owner-scoped read.

pub mod types;
pub mod filter;
pub mod filter_where;
pub mod filter_order;
pub mod page;
pub mod error;

pub use types::*;
pub use error::FilterError;
pub use filter::{Filter, ListParams, ListQuery};
pub use filter_order::{FilterOrder, OrderKey, Ordering};
pub use filter_where::{Condition, FilterWhere, Predicate};
pub use page::{clamp_page, PageBounds, PageSpec};
