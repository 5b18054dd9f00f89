use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use uuid::Uuid;

use super::AppState;
use crate::database::models::{NewRecipe, Recipe, RecipeDetail, RecipeUpdate};
use crate::database::Database;
use crate::filter::{ListParams, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/recipes - recipe rows only; children come with the detail view
pub async fn list<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<Recipe>> {
    let Query(params) = params?;
    let query = ListQuery::try_from(params)?;
    let page = state.recipes.list(user.user_id, &query).await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/recipes/:id
pub async fn get<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<RecipeDetail> {
    let Path(id) = id?;
    Ok(ApiResponse::success(state.recipes.get(user.user_id, id).await?))
}

/// POST /api/recipes - recipe with its steps and materials
pub async fn create<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<NewRecipe>, JsonRejection>,
) -> ApiResult<RecipeDetail> {
    let Json(input) = payload?;
    Ok(ApiResponse::created(state.recipes.create(user.user_id, &input).await?))
}

/// PUT /api/recipes/:id - `steps` / `assets`, when present, replace the
/// stored collection
pub async fn update<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RecipeUpdate>, JsonRejection>,
) -> ApiResult<RecipeDetail> {
    let Path(id) = id?;
    let Json(input) = payload?;
    Ok(ApiResponse::success(state.recipes.update(user.user_id, id, &input).await?))
}

/// DELETE /api/recipes/:id
pub async fn delete<D: Database>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;
    state.recipes.delete(user.user_id, id).await?;
    Ok(ApiResponse::<()>::no_content())
}
