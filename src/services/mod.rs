//! Transactional orchestration. Every public operation runs inside exactly one
//! unit of work and receives the caller's identity explicitly.

pub mod resource_service;
pub mod user_service;

pub use resource_service::{DbResourceService, ResourceService};
pub use user_service::{DbUserService, LoginOutcome, UserService};

use thiserror::Error;

use crate::auth::{PasswordError, TokenError};
use crate::database::models::{Item, Post};
use crate::database::DatabaseError;

pub type ItemService = dyn ResourceService<Item>;
pub type PostService = dyn ResourceService<Post>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}
