use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::warn;

use crate::auth::password::PasswordError;
use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::models::{Item, Post, Resource};
use crate::database::repository::{PgItemRepository, PgPostRepository, PgUserRepository};
use crate::database::{Database, DatabaseError, MemoryDatabase, MemoryRepository, MemoryUserRepository, PgDatabase};
use crate::error::ApiError;
use crate::handlers::{self, protected, public};
use crate::middleware::require_auth;
use crate::services::{DbResourceService, DbUserService, ItemService, PostService, ResourceService, UserService};

/// Liveness probe over whatever backend the state was built with.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> Result<(), DatabaseError>;
}

#[async_trait]
impl<D: Database> HealthCheck for D {
    async fn check(&self) -> Result<(), DatabaseError> {
        self.ping().await
    }
}

/// Shared handler state. Everything in here is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserService>,
    pub items: Arc<ItemService>,
    pub posts: Arc<PostService>,
    pub health: Arc<dyn HealthCheck>,
}

impl AppState {
    pub fn postgres(db: PgDatabase, config: &AppConfig) -> Result<Self, PasswordError> {
        let db = Arc::new(db);
        let tokens = Arc::new(token_service(config));
        Ok(Self {
            users: Arc::new(DbUserService::new(
                Arc::clone(&db),
                PgUserRepository,
                Arc::clone(&tokens),
                config.security.bcrypt_cost,
            )?),
            items: Arc::new(DbResourceService::<_, _, Item>::new(Arc::clone(&db), PgItemRepository)),
            posts: Arc::new(DbResourceService::<_, _, Post>::new(Arc::clone(&db), PgPostRepository)),
            health: db,
            tokens,
        })
    }

    pub fn in_memory(db: Arc<MemoryDatabase>, config: &AppConfig) -> Result<Self, PasswordError> {
        let tokens = Arc::new(token_service(config));
        Ok(Self {
            users: Arc::new(DbUserService::new(
                Arc::clone(&db),
                MemoryUserRepository,
                Arc::clone(&tokens),
                config.security.bcrypt_cost,
            )?),
            items: Arc::new(DbResourceService::<_, _, Item>::new(Arc::clone(&db), MemoryRepository::new())),
            posts: Arc::new(DbResourceService::<_, _, Post>::new(Arc::clone(&db), MemoryRepository::new())),
            health: db,
            tokens,
        })
    }
}

fn token_service(config: &AppConfig) -> TokenService {
    let ttl = i64::try_from(config.security.jwt_expiry_hours)
        .ok()
        .and_then(chrono::Duration::try_hours)
        .unwrap_or_else(|| chrono::Duration::hours(24));
    TokenService::new(&config.security.jwt_secret, ttl)
}

/// Resources exposed under `/api/u/:username/<kind>s`.
pub trait ServedResource: Resource + serde::Serialize {
    fn service(state: &AppState) -> &Arc<dyn ResourceService<Self>>;
}

impl ServedResource for Item {
    fn service(state: &AppState) -> &Arc<dyn ResourceService<Self>> {
        &state.items
    }
}

impl ServedResource for Post {
    fn service(state: &AppState) -> &Arc<dyn ResourceService<Self>> {
        &state.posts
    }
}

pub fn router(state: AppState, config: &AppConfig) -> Router {
    let auth = middleware::from_fn_with_state(Arc::clone(&state.tokens), require_auth);

    let users = Router::new()
        .route("/api/register", post(public::auth::register))
        .route("/api/login", post(public::auth::login))
        .route("/api/u/:username", get(public::users::profile));

    let items = Router::new()
        .route(
            "/api/u/:username/items",
            get(public::resources::list::<Item>)
                .merge(post(protected::resources::create::<Item>).route_layer(auth.clone())),
        )
        .route(
            "/api/u/:username/items/:item_id",
            get(public::resources::get::<Item>).merge(
                axum::routing::patch(protected::resources::update::<Item>)
                    .delete(protected::resources::delete::<Item>)
                    .route_layer(auth.clone()),
            ),
        );

    let posts = Router::new()
        .route(
            "/api/u/:username/posts",
            get(public::resources::list::<Post>)
                .merge(post(protected::resources::create::<Post>).route_layer(auth.clone())),
        )
        .route(
            "/api/u/:username/posts/:post_id",
            get(public::resources::get::<Post>).merge(
                axum::routing::patch(protected::resources::update::<Post>)
                    .delete(protected::resources::delete::<Post>)
                    .route_layer(auth),
            ),
        );

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(users)
        .merge(items)
        .merge(posts)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(middleware::map_response(envelope_bare_rejections))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .layer(CatchPanicLayer::custom(panic_response))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Axum's 405 and the timeout layer's 408 carry no body. Give them the usual
/// envelope, keeping headers such as `Allow`.
async fn envelope_bare_rejections(response: Response) -> Response {
    if response.headers().contains_key(header::CONTENT_TYPE) {
        return response;
    }
    let error = match response.status() {
        StatusCode::METHOD_NOT_ALLOWED => ApiError::MethodNotAllowed("Method not allowed".to_string()),
        StatusCode::REQUEST_TIMEOUT => ApiError::RequestTimeout("Request timed out".to_string()),
        _ => return response,
    };
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let enveloped = error.into_response();
    parts.headers.extend(enveloped.headers().clone());
    let (_, body) = enveloped.into_parts();
    Response::from_parts(parts, body)
}

fn panic_response(_: Box<dyn std::any::Any + Send + 'static>) -> Response {
    ApiError::internal_server_error("An error occurred while processing your request").into_response()
}
