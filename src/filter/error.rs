use thiserror::Error;

/// Errors raised while turning raw list parameters into a typed query.
///
/// The predicate and sort builders themselves never fail: fields outside the
/// whitelist are dropped. Only a structurally unusable request is rejected.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
