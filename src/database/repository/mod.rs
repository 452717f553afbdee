//! Storage seams. Each trait is generic over the backend's transaction type so
//! the same service code drives Postgres and the in-memory backend.

pub mod item;
pub mod post;
pub mod user;

pub use item::PgItemRepository;
pub use post::PgPostRepository;
pub use user::PgUserRepository;

use async_trait::async_trait;

use super::models::{Resource, User};
use super::DatabaseError;
use crate::types::{PageRequest, ResourceKey};

#[async_trait]
pub trait UserRepository<Tx: Send + 'static>: Send + Sync + 'static {
    /// Fails with `Conflict` when the username or email is taken.
    async fn insert(&self, tx: &mut Tx, user: &User) -> Result<(), DatabaseError>;

    async fn find_by_username(&self, tx: &mut Tx, username: &str) -> Result<Option<User>, DatabaseError>;
}

/// CRUD over one owned resource table. Every lookup and mutation is scoped by
/// `(id, owner)`.
#[async_trait]
pub trait ResourceRepository<Tx: Send + 'static, R: Resource>: Send + Sync + 'static {
    async fn insert(&self, tx: &mut Tx, row: &R) -> Result<(), DatabaseError>;

    async fn find(&self, tx: &mut Tx, key: &ResourceKey) -> Result<Option<R>, DatabaseError>;

    async fn count_by_owner(&self, tx: &mut Tx, owner: &str) -> Result<i64, DatabaseError>;

    /// Newest first.
    async fn list_by_owner(&self, tx: &mut Tx, owner: &str, page: PageRequest) -> Result<Vec<R>, DatabaseError>;

    /// Returns `false` when no row matched `row.key()`.
    async fn update(&self, tx: &mut Tx, row: &R) -> Result<bool, DatabaseError>;

    /// Returns `false` when no row matched.
    async fn delete(&self, tx: &mut Tx, key: &ResourceKey) -> Result<bool, DatabaseError>;
}
