// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth): register, login, profile and all reads.
// Protected (bearer token + ownership): create, update and delete under /api/u/:username.

pub mod protected;
pub mod public;

use axum::{body::Bytes, extract::State};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// Parse a path id; anything but a UUID is a client error.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid id: {}", raw)))
}

/// Parse a request body without relying on Content-Type.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::invalid_json(format!("Invalid JSON body: {}", e)))
}

/// GET /
pub async fn root() -> ApiResult<serde_json::Value> {
    Ok(ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/register, /api/login (public)",
            "profile": "/api/u/:username (public)",
            "items": "/api/u/:username/items[/:item_id] (reads public, writes owner only)",
            "posts": "/api/u/:username/posts[/:post_id] (reads public, writes owner only)",
            "health": "/health",
        }
    })))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    match state.health.check().await {
        Ok(()) => Ok(ApiResponse::success(json!({
            "status": "ok",
            "timestamp": Utc::now(),
            "database": "ok",
        }))),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            Err(ApiError::service_unavailable("Database unavailable"))
        }
    }
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
