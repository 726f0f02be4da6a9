//! Glexport API Library
//!
//! Read-only HTTP API over the glexport shipments schema: one resource
//! collection (`/api/v1/shipments`) with filtering, sorting, and pagination.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod openapi;
pub mod queries;

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
}

/// Versioned API routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new().route("/shipments", get(handlers::shipments::list_shipments))
}

/// Builds the full application router: health + v1 API + OpenAPI document.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(openapi::api_doc()) }),
        )
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    // Check database connectivity
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "environment": state.config.environment,
    }))
}
