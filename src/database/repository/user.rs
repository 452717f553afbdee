use async_trait::async_trait;

use super::UserRepository;
use crate::database::manager::{DatabaseError, PgTx};
use crate::database::models::User;

#[derive(Debug, Clone, Copy, Default)]
pub struct PgUserRepository;

#[async_trait]
impl UserRepository<PgTx> for PgUserRepository {
    async fn insert(&self, tx: &mut PgTx, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO users (user_id, username, email, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| DatabaseError::from_insert(e, "username or email"))?;
        Ok(())
    }

    async fn find_by_username(&self, tx: &mut PgTx, username: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, username, email, password_hash, created_at, updated_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(user)
    }
}
