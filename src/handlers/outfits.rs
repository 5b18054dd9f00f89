use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use uuid::Uuid;

use super::AppState;
use crate::database::models::{NewOutfit, Outfit, OutfitDetail, OutfitUpdate};
use crate::database::Database;
use crate::filter::{ListParams, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/outfits
pub async fn list<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<Outfit>> {
    let Query(params) = params?;
    let query = ListQuery::try_from(params)?;
    Ok(ApiResponse::page(state.outfits.list(user.user_id, &query).await?))
}

/// GET /api/outfits/:id - outfit with the items worn in it
pub async fn get<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<OutfitDetail> {
    let Path(id) = id?;
    Ok(ApiResponse::success(state.outfits.get(user.user_id, id).await?))
}

/// POST /api/outfits
pub async fn create<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<NewOutfit>, JsonRejection>,
) -> ApiResult<OutfitDetail> {
    let Json(input) = payload?;
    Ok(ApiResponse::created(state.outfits.create(user.user_id, &input).await?))
}

/// PUT /api/outfits/:id
pub async fn update<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<OutfitUpdate>, JsonRejection>,
) -> ApiResult<OutfitDetail> {
    let Path(id) = id?;
    let Json(input) = payload?;
    Ok(ApiResponse::success(state.outfits.update(user.user_id, id, &input).await?))
}

/// DELETE /api/outfits/:id
pub async fn delete<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;
    state.outfits.delete(user.user_id, id).await?;
    Ok(ApiResponse::<()>::no_content())
}
