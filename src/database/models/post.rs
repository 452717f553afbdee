use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::Resource;
use crate::auth::VerifiedIdentity;
use crate::types::ResourceKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Post {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub owner: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostInput {
    #[validate(
        length(max = 5000, message = "content is too long"),
        custom(function = "crate::database::models::not_blank")
    )]
    pub content: String,
}

/// PATCH body. Empty or omitted content keeps the stored text.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePostInput {
    #[validate(length(max = 5000, message = "content is too long"))]
    pub content: Option<String>,
}

impl Resource for Post {
    const KIND: &'static str = "post";

    type Create = CreatePostInput;
    type Update = UpdatePostInput;

    fn build(input: CreatePostInput, identity: &VerifiedIdentity, now: DateTime<Utc>) -> Self {
        Self {
            post_id: Uuid::new_v4(),
            user_id: identity.id(),
            owner: identity.username().to_string(),
            content: input.content,
            created_at: now,
            updated_at: now,
        }
    }

    fn merged(&self, changes: &UpdatePostInput, now: DateTime<Utc>) -> Self {
        let content = match changes.content.as_deref() {
            Some(c) if !c.trim().is_empty() => c.to_string(),
            _ => self.content.clone(),
        };
        Self {
            content,
            updated_at: now.max(self.updated_at),
            ..self.clone()
        }
    }

    fn key(&self) -> ResourceKey {
        ResourceKey::new(self.post_id, self.owner.clone())
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
