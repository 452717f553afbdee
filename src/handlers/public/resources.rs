// handlers/public/resources.rs - GET /api/u/:username/{items,posts}[/:id]
//
// Generic over the resource kind; the router instantiates one copy per kind.

use axum::extract::{Path, RawQuery, State};

use super::PageQuery;
use crate::app::{AppState, ServedResource};
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::{Page, ResourceKey};

/// List an owner's resources, newest first.
pub async fn list<T: ServedResource>(
    State(state): State<AppState>,
    Path(username): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Page<T>> {
    let request = PageQuery::from_raw(query.as_deref()).into();
    let page = T::service(&state).list(&username, request).await?;
    Ok(ApiResponse::success(page))
}

pub async fn get<T: ServedResource>(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, String)>,
) -> ApiResult<T> {
    let key = ResourceKey::new(parse_id(&id)?, username);
    let found = T::service(&state).get(key).await?;
    Ok(ApiResponse::success(found))
}
