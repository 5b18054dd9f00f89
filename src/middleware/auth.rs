use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the account id, set by the authenticating proxy
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated account context for owner-scoped handlers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Resolves the requesting account and injects [`AuthUser`] into the request.
/// Session handling happens upstream; this layer only trusts and parses the
/// forwarded id.
pub async fn user_context_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = extract_user_id(&headers).map_err(ApiError::unauthorized)?;

    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

fn extract_user_id(headers: &HeaderMap) -> Result<Uuid, String> {
    let value = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| format!("Missing {} header", USER_ID_HEADER))?;

    let raw = value
        .to_str()
        .map_err(|_| format!("Invalid {} header format", USER_ID_HEADER))?;

    Uuid::parse_str(raw.trim()).map_err(|_| format!("{} must be a UUID", USER_ID_HEADER))
}
