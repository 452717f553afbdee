use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::Resource;
use crate::auth::VerifiedIdentity;
use crate::types::ResourceKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Item {
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub owner: String,
    pub name: String,
    pub quantity: i32,
    pub price: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateItemInput {
    #[validate(
        length(max = 200, message = "name is too long"),
        custom(function = "crate::database::models::not_blank")
    )]
    pub name: String,
    #[validate(range(min = 1, message = "quantity must be greater than zero"))]
    pub quantity: i32,
    #[validate(range(min = 1, message = "price must be greater than zero"))]
    pub price: i64,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
}

/// PATCH body. Omitted, empty and zero fields keep the stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateItemInput {
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "quantity cannot be negative"))]
    pub quantity: Option<i32>,
    #[validate(range(min = 0, message = "price cannot be negative"))]
    pub price: Option<i64>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl Resource for Item {
    const KIND: &'static str = "item";

    type Create = CreateItemInput;
    type Update = UpdateItemInput;

    /// New item owned by `identity`. The owner never comes from the body.
    fn build(input: CreateItemInput, identity: &VerifiedIdentity, now: DateTime<Utc>) -> Self {
        Self {
            item_id: Uuid::new_v4(),
            user_id: identity.id(),
            owner: identity.username().to_string(),
            name: input.name.trim().to_string(),
            quantity: input.quantity,
            price: input.price,
            description: input.description.trim().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update over the stored row.
    fn merged(&self, changes: &UpdateItemInput, now: DateTime<Utc>) -> Self {
        let text = |value: &Option<String>, current: &str| match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => current.to_string(),
        };

        Self {
            name: text(&changes.name, &self.name),
            quantity: changes.quantity.filter(|q| *q > 0).unwrap_or(self.quantity),
            price: changes.price.filter(|p| *p > 0).unwrap_or(self.price),
            description: text(&changes.description, &self.description),
            updated_at: now.max(self.updated_at),
            ..self.clone()
        }
    }

    fn key(&self) -> ResourceKey {
        ResourceKey::new(self.item_id, self.owner.clone())
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stored() -> Item {
        let identity = VerifiedIdentity::new(Uuid::new_v4(), "seller".into());
        Item::build(
            CreateItemInput {
                name: "  Lamp ".into(),
                quantity: 3,
                price: 4500,
                description: "brass".into(),
            },
            &identity,
            Utc::now() - Duration::minutes(5),
        )
    }

    #[test]
    fn owner_comes_from_identity() {
        let item = stored();
        assert_eq!(item.owner, "seller");
        assert_eq!(item.name, "Lamp");
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn merge_keeps_omitted_empty_and_zero_fields() {
        let item = stored();
        let changes = UpdateItemInput {
            name: Some("   ".into()),
            quantity: Some(0),
            price: Some(5200),
            description: None,
        };
        let now = Utc::now();
        let merged = item.merged(&changes, now);

        assert_eq!(merged.price, 5200);
        assert_eq!(merged.name, item.name);
        assert_eq!(merged.quantity, item.quantity);
        assert_eq!(merged.description, item.description);
        assert_eq!(merged.item_id, item.item_id);
        assert_eq!(merged.created_at, item.created_at);
        assert_eq!(merged.updated_at, now);
    }

    #[test]
    fn negative_values_fail_validation() {
        let changes = UpdateItemInput {
            quantity: Some(-1),
            ..Default::default()
        };
        assert!(changes.validate().is_err());
        assert!(UpdateItemInput::default().validate().is_ok());
    }
}
