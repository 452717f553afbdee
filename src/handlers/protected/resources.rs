// handlers/protected/resources.rs - POST, PATCH, DELETE under /api/u/:username/{items,posts}

use axum::{
    body::Bytes,
    extract::{Path, State},
};
use serde::de::DeserializeOwned;

use crate::app::{AppState, ServedResource};
use crate::auth::VerifiedIdentity;
use crate::handlers::{parse_id, parse_json};
use crate::middleware::{ensure_owner, ApiResponse, ApiResult};

/// POST /api/u/:username/{kind}s - 201 with the stored resource.
pub async fn create<T>(
    State(state): State<AppState>,
    identity: VerifiedIdentity,
    Path(username): Path<String>,
    body: Bytes,
) -> ApiResult<T>
where
    T: ServedResource,
    T::Create: DeserializeOwned,
{
    ensure_owner(&username, &identity)?;
    let input: T::Create = parse_json(&body)?;

    let created = T::service(&state).create(&identity, input).await?;
    Ok(ApiResponse::created(created))
}

/// PATCH /api/u/:username/{kind}s/:id - omitted, empty or zero fields keep
/// their stored value.
pub async fn update<T>(
    State(state): State<AppState>,
    identity: VerifiedIdentity,
    Path((username, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<T>
where
    T: ServedResource,
    T::Update: DeserializeOwned,
{
    ensure_owner(&username, &identity)?;
    let id = parse_id(&id)?;
    let changes: T::Update = parse_json(&body)?;

    let updated = T::service(&state).update(&identity, id, changes).await?;
    Ok(ApiResponse::success(updated))
}

pub async fn delete<T: ServedResource>(
    State(state): State<AppState>,
    identity: VerifiedIdentity,
    Path((username, id)): Path<(String, String)>,
) -> ApiResult<()> {
    ensure_owner(&username, &identity)?;
    let id = parse_id(&id)?;

    T::service(&state).delete(&identity, id).await?;
    Ok(ApiResponse::empty(format!("{} deleted", T::KIND)))
}
