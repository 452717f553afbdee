// handlers/public/auth.rs - POST /api/register, POST /api/login

use axum::{body::Bytes, extract::State};

use crate::app::AppState;
use crate::database::models::{LoginInput, RegisterInput, UserProfile};
use crate::handlers::parse_json;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::LoginOutcome;

/// POST /api/register - create an account.
///
/// Body: `{"username", "email", "password"}`. Returns the public profile with
/// 201, 400 on validation failure, 409 when username or email is taken.
pub async fn register(State(state): State<AppState>, body: Bytes) -> ApiResult<UserProfile> {
    let input: RegisterInput = parse_json(&body)?;
    let profile = state.users.register(input).await?;
    Ok(ApiResponse::created(profile))
}

/// POST /api/login - exchange credentials for a bearer token.
///
/// Unknown usernames and wrong passwords both answer 401 with the same message.
pub async fn login(State(state): State<AppState>, body: Bytes) -> ApiResult<LoginOutcome> {
    let input: LoginInput = parse_json(&body)?;
    let outcome = state.users.login(input).await?;
    Ok(ApiResponse::with_status(outcome, axum::http::StatusCode::OK, "Login successful"))
}
