pub mod item;
pub mod post;
pub mod user;

pub use item::{CreateItemInput, Item, UpdateItemInput};
pub use post::{CreatePostInput, Post, UpdatePostInput};
pub use user::{LoginInput, RegisterInput, User, UserProfile};

use chrono::{DateTime, Utc};
use validator::{Validate, ValidationError};

use crate::auth::VerifiedIdentity;
use crate::types::ResourceKey;

/// A row that belongs to exactly one user and is addressed by `(id, owner)`.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Singular noun used in logs and not-found messages.
    const KIND: &'static str;

    type Create: Validate + Send + 'static;
    type Update: Validate + Send + Sync + 'static;

    fn build(input: Self::Create, identity: &VerifiedIdentity, now: DateTime<Utc>) -> Self;

    /// Stored row with `changes` laid over it and `updated_at` moved forward.
    fn merged(&self, changes: &Self::Update, now: DateTime<Utc>) -> Self;

    fn key(&self) -> ResourceKey;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}
