// Generic owner-scoped CRUD handlers, instantiated once per top-level resource
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use uuid::Uuid;

use super::AppState;
use crate::database::models::Resource;
use crate::database::{Database, Repository, Store};
use crate::filter::{ListParams, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/:resource - filtered, sorted, paginated list of the caller's rows
pub async fn list<R: Resource, D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<R>> {
    let Query(params) = params?;
    let query = ListQuery::try_from(params)?;

    let mut session = state.db.begin().await?;
    let page = Repository::<R>::new(state.bounds)
        .list(&mut session, &query, user.user_id)
        .await?;
    session.commit().await?;

    Ok(ApiResponse::page(page))
}

/// GET /api/:resource/:id
pub async fn get<R: Resource, D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<R> {
    let Path(id) = id?;
    let mut session = state.db.begin().await?;
    let row = Repository::<R>::new(state.bounds)
        .select_404(&mut session, user.user_id, id)
        .await?;
    session.commit().await?;
    Ok(ApiResponse::success(row))
}

/// POST /api/:resource
pub async fn create<R: Resource, D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<R::Create>, JsonRejection>,
) -> ApiResult<R> {
    let Json(input) = payload?;
    let mut session = state.db.begin().await?;
    let row = Repository::<R>::new(state.bounds)
        .create(&mut session, user.user_id, &input)
        .await?;
    session.commit().await?;
    Ok(ApiResponse::created(row))
}

/// PUT /api/:resource/:id - partial update; absent fields are left alone
pub async fn update<R: Resource, D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<R::Update>, JsonRejection>,
) -> ApiResult<R> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let mut session = state.db.begin().await?;
    let row = Repository::<R>::new(state.bounds)
        .update(&mut session, user.user_id, id, &input)
        .await?;
    session.commit().await?;
    Ok(ApiResponse::success(row))
}

/// DELETE /api/:resource/:id
pub async fn delete<R: Resource, D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;
    let mut session = state.db.begin().await?;
    Repository::<R>::new(state.bounds)
        .delete(&mut session, user.user_id, id)
        .await?;
    session.commit().await?;
    Ok(ApiResponse::<()>::no_content())
}
