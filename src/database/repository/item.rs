use async_trait::async_trait;

use super::ResourceRepository;
use crate::database::manager::{DatabaseError, PgTx};
use crate::database::models::Item;
use crate::types::{PageRequest, ResourceKey};

const COLUMNS: &str = "item_id, user_id, owner, name, quantity, price, description, created_at, updated_at";

#[derive(Debug, Clone, Copy, Default)]
pub struct PgItemRepository;

#[async_trait]
impl ResourceRepository<PgTx, Item> for PgItemRepository {
    async fn insert(&self, tx: &mut PgTx, item: &Item) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO items (item_id, user_id, owner, name, quantity, price, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(item.item_id)
        .bind(item.user_id)
        .bind(&item.owner)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.price)
        .bind(&item.description)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| DatabaseError::from_insert(e, "item"))?;
        Ok(())
    }

    async fn find(&self, tx: &mut PgTx, key: &ResourceKey) -> Result<Option<Item>, DatabaseError> {
        let sql = format!("SELECT {} FROM items WHERE item_id = $1 AND owner = $2", COLUMNS);
        let item = sqlx::query_as::<_, Item>(&sql)
            .bind(key.id)
            .bind(&key.owner)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(item)
    }

    async fn count_by_owner(&self, tx: &mut PgTx, owner: &str) -> Result<i64, DatabaseError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE owner = $1")
            .bind(owner)
            .fetch_one(&mut **tx)
            .await?;
        Ok(total)
    }

    async fn list_by_owner(&self, tx: &mut PgTx, owner: &str, page: PageRequest) -> Result<Vec<Item>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM items WHERE owner = $1 ORDER BY created_at DESC, item_id DESC LIMIT $2 OFFSET $3",
            COLUMNS
        );
        let items = sqlx::query_as::<_, Item>(&sql)
            .bind(owner)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut **tx)
            .await?;
        Ok(items)
    }

    async fn update(&self, tx: &mut PgTx, item: &Item) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE items SET name = $1, quantity = $2, price = $3, description = $4, updated_at = $5 \
             WHERE item_id = $6 AND owner = $7",
        )
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.price)
        .bind(&item.description)
        .bind(item.updated_at)
        .bind(item.item_id)
        .bind(&item.owner)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, tx: &mut PgTx, key: &ResourceKey) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM items WHERE item_id = $1 AND owner = $2")
            .bind(key.id)
            .bind(&key.owner)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
