#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use outfit_recipe_api::config::AppConfig;
use outfit_recipe_api::database::MemoryDatabase;
use outfit_recipe_api::handlers::{router, AppState};
use outfit_recipe_api::middleware::USER_ID_HEADER;

/// Router over a fresh in-memory store, driven with `oneshot`
pub struct TestApp {
    pub db: MemoryDatabase,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig::development();
        let db = MemoryDatabase::new();
        let router = router(AppState::new(db.clone(), config.page_bounds()), &config);
        Self { db, router }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        if bytes.is_empty() {
            return Ok((status, Value::Null));
        }
        let value = serde_json::from_slice(&bytes)
            .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?;
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, user: Uuid) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(user), None).await
    }

    pub async fn post(&self, uri: &str, user: Uuid, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(user), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: Uuid, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, uri, Some(user), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: Uuid) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, uri, Some(user), None).await
    }

    /// POST and return the created row's `data`
    pub async fn create(&self, uri: &str, user: Uuid, body: Value) -> Result<Value> {
        let (status, body) = self.post(uri, user, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "expected 201, got {}: {}", status, body);
        Ok(body["data"].clone())
    }
}

pub fn ids(data: &Value) -> Vec<String> {
    data.as_array()
        .map(|rows| rows.iter().filter_map(|r| r["id"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

pub fn id_of(row: &Value) -> Result<Uuid> {
    let raw = row["id"].as_str().context("row has no id")?;
    Ok(Uuid::parse_str(raw)?)
}
