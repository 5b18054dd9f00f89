// Avatar x item compatibility matrix
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use crate::database::models::{Compatibility, CompatibilityUpdate, CompatibilityUpsert, Matrix};
use crate::database::Database;
use crate::filter::{ListParams, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Default, Deserialize)]
pub struct MatrixParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/compatibility
pub async fn list<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<Compatibility>> {
    let Query(params) = params?;
    let query = ListQuery::try_from(params)?;
    Ok(ApiResponse::page(state.compatibility.list(user.user_id, &query).await?))
}

/// POST /api/compatibility - 201 for a new cell, 200 when one was overwritten
pub async fn upsert<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CompatibilityUpsert>, JsonRejection>,
) -> ApiResult<Compatibility> {
    let Json(input) = payload?;
    let (cell, created) = state.compatibility.upsert(user.user_id, &input).await?;
    Ok(if created { ApiResponse::created(cell) } else { ApiResponse::success(cell) })
}

/// PUT /api/compatibility/:avatar_id/:item_id
pub async fn update<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    ids: Result<Path<(Uuid, Uuid)>, PathRejection>,
    payload: Result<Json<CompatibilityUpdate>, JsonRejection>,
) -> ApiResult<Compatibility> {
    let Path((avatar_id, item_id)) = ids?;
    let Json(input) = payload?;
    let cell = state.compatibility.update(user.user_id, avatar_id, item_id, &input).await?;
    Ok(ApiResponse::success(cell))
}

/// GET /api/matrix?limit=&offset= - one window of both axes
pub async fn matrix<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<MatrixParams>, QueryRejection>,
) -> ApiResult<Matrix> {
    let Query(params) = params?;
    let matrix = state.compatibility.matrix(user.user_id, params.limit, params.offset).await?;
    Ok(ApiResponse::success(matrix))
}
