pub mod auth;
pub mod response;

pub use auth::{user_context_middleware, AuthUser, USER_ID_HEADER};
pub use response::{ApiResponse, ApiResult};
