use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::auth::TokenService;
use crate::error::ApiError;

const UNAUTHORIZED: &str = "Invalid or missing authentication token";

/// Bearer token gate. On success the request carries a
/// [`VerifiedIdentity`](crate::auth::VerifiedIdentity) extension; on any
/// failure the inner handler never runs.
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(request.headers()).map_err(|reason| {
        warn!(path = %request.uri().path(), reason, "rejected request");
        ApiError::unauthorized(UNAUTHORIZED)
    })?;

    let identity = tokens.verify(token).map_err(|e| {
        warn!(path = %request.uri().path(), error = %e, "token verification failed");
        ApiError::unauthorized(UNAUTHORIZED)
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`.
fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or("missing authorization header")?
        .to_str()
        .map_err(|_| "authorization header is not ascii")?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or("authorization header is not a bearer token")?
        .trim();

    if token.is_empty() {
        return Err("empty bearer token");
    }
    Ok(token)
}
