// handlers/mod.rs - HTTP surface
//
// Everything under /api runs behind the user context middleware and is scoped
// to the caller. /health is open.
pub mod compatibility;
pub mod outfits;
pub mod recipes;
pub mod resource;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, put};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::database::models::{Asset, Avatar, Item, Resource};
use crate::database::Database;
use crate::error::ApiError;
use crate::filter::PageBounds;
use crate::middleware::{user_context_middleware, USER_ID_HEADER};
use crate::services::{CompatibilityService, OutfitService, RecipeService};

/// Shared handler state
#[derive(Clone)]
pub struct AppState<D: Database> {
    pub db: D,
    pub bounds: PageBounds,
    pub outfits: OutfitService<D>,
    pub recipes: RecipeService<D>,
    pub compatibility: CompatibilityService<D>,
}

impl<D: Database> AppState<D> {
    pub fn new(db: D, bounds: PageBounds) -> Self {
        Self {
            outfits: OutfitService::new(db.clone(), bounds),
            recipes: RecipeService::new(db.clone(), bounds),
            compatibility: CompatibilityService::new(db.clone(), bounds),
            db,
            bounds,
        }
    }
}

pub fn router<D: Database>(state: AppState<D>, config: &AppConfig) -> Router {
    let api = Router::new()
        .merge(resource_routes::<Avatar, D>())
        .merge(resource_routes::<Item, D>())
        .merge(resource_routes::<Asset, D>())
        .route("/outfits", get(outfits::list::<D>).post(outfits::create::<D>))
        .route(
            "/outfits/:id",
            get(outfits::get::<D>)
                .put(outfits::update::<D>)
                .delete(outfits::delete::<D>),
        )
        .route("/recipes", get(recipes::list::<D>).post(recipes::create::<D>))
        .route(
            "/recipes/:id",
            get(recipes::get::<D>)
                .put(recipes::update::<D>)
                .delete(recipes::delete::<D>),
        )
        .route(
            "/compatibility",
            get(compatibility::list::<D>).post(compatibility::upsert::<D>),
        )
        .route("/compatibility/:avatar_id/:item_id", put(compatibility::update::<D>))
        .route("/matrix", get(compatibility::matrix::<D>))
        .route_layer(middleware::from_fn(user_context_middleware));

    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(health::<D>))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        app = app.layer(cors_layer(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}

fn resource_routes<R: Resource, D: Database>() -> Router<AppState<D>> {
    Router::new()
        .route(
            &format!("/{}", R::PATH),
            get(resource::list::<R, D>).post(resource::create::<R, D>),
        )
        .route(
            &format!("/{}/:id", R::PATH),
            get(resource::get::<R, D>)
                .put(resource::update::<R, D>)
                .delete(resource::delete::<R, D>),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health (public)",
                "resources": "/api/{avatars,items,assets}[/:id]",
                "outfits": "/api/outfits[/:id] (with worn items)",
                "recipes": "/api/recipes[/:id] (with nested steps and assets)",
                "compatibility": "/api/compatibility[/:avatar_id/:item_id], /api/matrix",
            }
        }
    }))
}

/// GET /health
async fn health<D: Database>(State(state): State<AppState<D>>) -> Result<Json<Value>, ApiError> {
    state.db.health_check().await?;
    Ok(Json(json!({
        "success": true,
        "data": { "status": "ok", "timestamp": chrono::Utc::now() }
    })))
}
