use async_trait::async_trait;

use super::ResourceRepository;
use crate::database::manager::{DatabaseError, PgTx};
use crate::database::models::Post;
use crate::types::{PageRequest, ResourceKey};

const COLUMNS: &str = "post_id, user_id, owner, content, created_at, updated_at";

#[derive(Debug, Clone, Copy, Default)]
pub struct PgPostRepository;

#[async_trait]
impl ResourceRepository<PgTx, Post> for PgPostRepository {
    async fn insert(&self, tx: &mut PgTx, post: &Post) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO posts (post_id, user_id, owner, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(post.post_id)
        .bind(post.user_id)
        .bind(&post.owner)
        .bind(&post.content)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| DatabaseError::from_insert(e, "post"))?;
        Ok(())
    }

    async fn find(&self, tx: &mut PgTx, key: &ResourceKey) -> Result<Option<Post>, DatabaseError> {
        let sql = format!("SELECT {} FROM posts WHERE post_id = $1 AND owner = $2", COLUMNS);
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(key.id)
            .bind(&key.owner)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(post)
    }

    async fn count_by_owner(&self, tx: &mut PgTx, owner: &str) -> Result<i64, DatabaseError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE owner = $1")
            .bind(owner)
            .fetch_one(&mut **tx)
            .await?;
        Ok(total)
    }

    async fn list_by_owner(&self, tx: &mut PgTx, owner: &str, page: PageRequest) -> Result<Vec<Post>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM posts WHERE owner = $1 ORDER BY created_at DESC, post_id DESC LIMIT $2 OFFSET $3",
            COLUMNS
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(owner)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut **tx)
            .await?;
        Ok(posts)
    }

    async fn update(&self, tx: &mut PgTx, post: &Post) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE posts SET content = $1, updated_at = $2 WHERE post_id = $3 AND owner = $4")
            .bind(&post.content)
            .bind(post.updated_at)
            .bind(post.post_id)
            .bind(&post.owner)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, tx: &mut PgTx, key: &ResourceKey) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM posts WHERE post_id = $1 AND owner = $2")
            .bind(key.id)
            .bind(&key.owner)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
