use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::ServiceError;
use crate::auth::password::{self, PasswordError};
use crate::auth::TokenService;
use crate::database::models::{LoginInput, RegisterInput, User, UserProfile};
use crate::database::repository::UserRepository;
use crate::database::unit_of_work::{self, Database};
use crate::database::DatabaseError;

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn register(&self, input: RegisterInput) -> Result<UserProfile, ServiceError>;

    /// Unknown usernames and wrong passwords fail identically.
    async fn login(&self, input: LoginInput) -> Result<LoginOutcome, ServiceError>;

    async fn profile(&self, username: &str) -> Result<UserProfile, ServiceError>;
}

pub struct DbUserService<D, R> {
    db: Arc<D>,
    repo: Arc<R>,
    tokens: Arc<TokenService>,
    bcrypt_cost: u32,
    dummy_hash: Arc<str>,
}

impl<D, R> DbUserService<D, R> {
    /// Hashes the unknown-user placeholder up front at `bcrypt_cost`.
    pub fn new(db: Arc<D>, repo: R, tokens: Arc<TokenService>, bcrypt_cost: u32) -> Result<Self, PasswordError> {
        let dummy_hash = password::dummy_hash(bcrypt_cost)?;
        Ok(Self {
            db,
            repo: Arc::new(repo),
            tokens,
            bcrypt_cost,
            dummy_hash: Arc::from(dummy_hash),
        })
    }
}

// bcrypt is deliberately slow; keep it off the async workers
async fn hash_blocking(plaintext: String, cost: u32) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || password::hash_password(&plaintext, cost))
        .await
        .map_err(|e| ServiceError::Internal(format!("hash task: {}", e)))?
        .map_err(ServiceError::from)
}

async fn verify_blocking(plaintext: String, stored: Option<String>, dummy: Arc<str>) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || match stored {
        Some(hash) => password::verify_password(&plaintext, &hash),
        None => {
            password::verify_dummy(&plaintext, &dummy);
            Ok(false)
        }
    })
    .await
    .map_err(|e| ServiceError::Internal(format!("verify task: {}", e)))?
    .map_err(ServiceError::from)
}

#[async_trait]
impl<D, R> UserService for DbUserService<D, R>
where
    D: Database,
    R: UserRepository<D::Tx>,
{
    async fn register(&self, input: RegisterInput) -> Result<UserProfile, ServiceError> {
        input.validate()?;

        let password_hash = hash_blocking(input.password, self.bcrypt_cost).await?;
        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            username: input.username,
            email: input.email.trim().to_lowercase(),
            password_hash,
            created_at: now,
            updated_at: now,
        };

        let repo = Arc::clone(&self.repo);
        let created = unit_of_work::run(&*self.db, "user.register", move |tx| {
            Box::pin(async move {
                repo.insert(tx, &user).await?;
                Ok::<_, ServiceError>(user)
            })
        })
        .await
        .map_err(|e| match e {
            ServiceError::Database(DatabaseError::Conflict(_)) => {
                ServiceError::Conflict("username or email already registered".to_string())
            }
            other => other,
        })?;

        info!(username = %created.username, "user registered");
        Ok(created.into())
    }

    async fn login(&self, input: LoginInput) -> Result<LoginOutcome, ServiceError> {
        input.validate()?;

        let repo = Arc::clone(&self.repo);
        let username = input.username.clone();
        let user = unit_of_work::run(&*self.db, "user.login", move |tx| {
            Box::pin(async move { Ok::<_, ServiceError>(repo.find_by_username(tx, &username).await?) })
        })
        .await?;

        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let matches = verify_blocking(input.password, stored_hash, Arc::clone(&self.dummy_hash)).await?;

        let user = match user {
            Some(user) if matches => user,
            _ => {
                warn!(username = %input.username, "login rejected");
                return Err(ServiceError::InvalidCredentials);
            }
        };

        let issued = self.tokens.issue(user.user_id, &user.username)?;
        info!(username = %user.username, "login succeeded");
        Ok(LoginOutcome {
            token: issued.token,
            expires_at: issued.expires_at,
            user: user.into(),
        })
    }

    async fn profile(&self, username: &str) -> Result<UserProfile, ServiceError> {
        let repo = Arc::clone(&self.repo);
        let username = username.to_string();
        let user = unit_of_work::run(&*self.db, "user.profile", move |tx| {
            Box::pin(async move { Ok::<_, ServiceError>(repo.find_by_username(tx, &username).await?) })
        })
        .await?;

        user.map(UserProfile::from).ok_or(ServiceError::NotFound("user"))
    }
}
