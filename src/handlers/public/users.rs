// handlers/public/users.rs - GET /api/u/:username

use axum::extract::{Path, State};

use crate::app::AppState;
use crate::database::models::UserProfile;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn profile(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<UserProfile> {
    let profile = state.users.profile(&username).await?;
    Ok(ApiResponse::success(profile))
}
