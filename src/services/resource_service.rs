use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::ServiceError;
use crate::auth::VerifiedIdentity;
use crate::database::models::Resource;
use crate::database::repository::ResourceRepository;
use crate::database::unit_of_work::{self, Database};
use crate::types::{Page, PageRequest, ResourceKey};

/// CRUD over one kind of owned resource.
///
/// Mutations take the caller's identity and scope every lookup by
/// `(id, identity.username)`, so a resource owned by someone else is
/// indistinguishable from one that does not exist.
#[async_trait]
pub trait ResourceService<T: Resource>: Send + Sync {
    async fn create(&self, identity: &VerifiedIdentity, input: T::Create) -> Result<T, ServiceError>;

    async fn get(&self, key: ResourceKey) -> Result<T, ServiceError>;

    async fn list(&self, owner: &str, page: PageRequest) -> Result<Page<T>, ServiceError>;

    async fn update(&self, identity: &VerifiedIdentity, id: Uuid, changes: T::Update) -> Result<T, ServiceError>;

    async fn delete(&self, identity: &VerifiedIdentity, id: Uuid) -> Result<(), ServiceError>;
}

pub struct DbResourceService<D, R, T> {
    db: Arc<D>,
    repo: Arc<R>,
    _resource: PhantomData<fn() -> T>,
}

impl<D, R, T> DbResourceService<D, R, T> {
    pub fn new(db: Arc<D>, repo: R) -> Self {
        Self {
            db,
            repo: Arc::new(repo),
            _resource: PhantomData,
        }
    }
}

fn operation<T: Resource>(action: &str) -> String {
    format!("{}.{}", T::KIND, action)
}

#[async_trait]
impl<D, R, T> ResourceService<T> for DbResourceService<D, R, T>
where
    D: Database,
    T: Resource,
    R: ResourceRepository<D::Tx, T>,
{
    async fn create(&self, identity: &VerifiedIdentity, input: T::Create) -> Result<T, ServiceError> {
        input.validate()?;
        let row = T::build(input, identity, Utc::now());
        let repo = Arc::clone(&self.repo);

        let created = unit_of_work::run(&*self.db, &operation::<T>("create"), move |tx| {
            Box::pin(async move {
                repo.insert(tx, &row).await?;
                Ok::<_, ServiceError>(row)
            })
        })
        .await?;

        let key = created.key();
        info!(kind = T::KIND, id = %key.id, owner = %key.owner, "created");
        Ok(created)
    }

    async fn get(&self, key: ResourceKey) -> Result<T, ServiceError> {
        let repo = Arc::clone(&self.repo);
        unit_of_work::run(&*self.db, &operation::<T>("get"), move |tx| {
            Box::pin(async move {
                let found = repo.find(tx, &key).await?;
                found.ok_or(ServiceError::NotFound(T::KIND))
            })
        })
        .await
    }

    async fn list(&self, owner: &str, page: PageRequest) -> Result<Page<T>, ServiceError> {
        if owner.trim().is_empty() {
            return Err(ServiceError::BadRequest("owner is required".to_string()));
        }
        let owner = owner.to_string();
        let repo = Arc::clone(&self.repo);

        let (rows, total) = unit_of_work::run(&*self.db, &operation::<T>("list"), move |tx| {
            Box::pin(async move {
                let total = repo.count_by_owner(tx, &owner).await?;
                let rows = repo.list_by_owner(tx, &owner, page).await?;
                Ok::<_, ServiceError>((rows, total))
            })
        })
        .await?;

        Ok(Page::new(rows, total, page))
    }

    async fn update(&self, identity: &VerifiedIdentity, id: Uuid, changes: T::Update) -> Result<T, ServiceError> {
        changes.validate()?;
        let key = ResourceKey::new(id, identity.username());
        let repo = Arc::clone(&self.repo);

        let updated = unit_of_work::run(&*self.db, &operation::<T>("update"), move |tx| {
            Box::pin(async move {
                let current = repo
                    .find(tx, &key)
                    .await?
                    .ok_or(ServiceError::NotFound(T::KIND))?;
                let next = current.merged(&changes, Utc::now());
                if !repo.update(tx, &next).await? {
                    return Err(ServiceError::NotFound(T::KIND));
                }
                Ok::<_, ServiceError>(next)
            })
        })
        .await?;

        info!(kind = T::KIND, id = %id, owner = identity.username(), "updated");
        Ok(updated)
    }

    async fn delete(&self, identity: &VerifiedIdentity, id: Uuid) -> Result<(), ServiceError> {
        let key = ResourceKey::new(id, identity.username());
        let repo = Arc::clone(&self.repo);

        unit_of_work::run(&*self.db, &operation::<T>("delete"), move |tx| {
            Box::pin(async move {
                if !repo.delete(tx, &key).await? {
                    return Err(ServiceError::NotFound(T::KIND));
                }
                Ok::<_, ServiceError>(())
            })
        })
        .await?;

        info!(kind = T::KIND, id = %id, owner = identity.username(), "deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::{MemoryDatabase, MemoryRepository};
    use crate::database::models::{CreateItemInput, CreatePostInput, Item, Post, UpdateItemInput, UpdatePostInput};
    use std::time::Duration;

    type Items = DbResourceService<MemoryDatabase, MemoryRepository<Item>, Item>;
    type Posts = DbResourceService<MemoryDatabase, MemoryRepository<Post>, Post>;

    fn setup() -> (Arc<MemoryDatabase>, Items, Posts) {
        let db = Arc::new(MemoryDatabase::new());
        let items = DbResourceService::new(Arc::clone(&db), MemoryRepository::new());
        let posts = DbResourceService::new(Arc::clone(&db), MemoryRepository::new());
        (db, items, posts)
    }

    fn identity(name: &str) -> VerifiedIdentity {
        VerifiedIdentity::new(Uuid::new_v4(), name.to_string())
    }

    fn lamp() -> CreateItemInput {
        CreateItemInput {
            name: "Lamp".into(),
            quantity: 2,
            price: 4500,
            description: "brass desk lamp".into(),
        }
    }

    #[tokio::test]
    async fn create_takes_owner_from_identity() {
        let (_, items, _) = setup();
        let alice = identity("alice");

        let item = items.create(&alice, lamp()).await.unwrap();
        assert_eq!(item.owner, "alice");
        assert_eq!(item.user_id, alice.id());

        let fetched = items.get(ResourceKey::new(item.item_id, "alice")).await.unwrap();
        assert_eq!(fetched, item);
    }

    #[tokio::test]
    async fn invalid_input_never_opens_a_transaction() {
        let (db, items, _) = setup();
        let mut input = lamp();
        input.quantity = 0;

        let err = items.create(&identity("alice"), input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
        assert_eq!(db.stats().commits + db.stats().rollbacks, 0);
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let (_, items, _) = setup();
        let alice = identity("alice");
        let original = items.create(&alice, lamp()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let changes = UpdateItemInput {
            price: Some(5200),
            ..Default::default()
        };
        let updated = items.update(&alice, original.item_id, changes).await.unwrap();

        assert_eq!(updated.price, 5200);
        assert_eq!(updated.name, original.name);
        assert_eq!(updated.quantity, original.quantity);
        assert_eq!(updated.description, original.description);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);

        let stored = items.get(original.key()).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn update_of_foreign_resource_is_not_found() {
        let (_, items, _) = setup();
        let alice = identity("alice");
        let bob = identity("bob");
        let item = items.create(&alice, lamp()).await.unwrap();

        let changes = UpdateItemInput {
            name: Some("Hijacked".into()),
            ..Default::default()
        };
        let err = items.update(&bob, item.item_id, changes).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("item")));
        assert_eq!(items.get(item.key()).await.unwrap().name, "Lamp");
    }

    #[tokio::test]
    async fn delete_missing_or_foreign_is_not_found_and_mutates_nothing() {
        let (db, items, _) = setup();
        let alice = identity("alice");
        let bob = identity("bob");
        let item = items.create(&alice, lamp()).await.unwrap();
        let commits_before = db.stats().commits;

        let missing = items.delete(&alice, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound(_)));

        let foreign = items.delete(&bob, item.item_id).await.unwrap_err();
        assert!(matches!(foreign, ServiceError::NotFound(_)));

        assert_eq!(db.stats().commits, commits_before);
        assert!(items.get(item.key()).await.is_ok());

        items.delete(&alice, item.item_id).await.unwrap();
        assert!(matches!(
            items.get(item.key()).await,
            Err(ServiceError::NotFound("item"))
        ));
    }

    #[tokio::test]
    async fn pagination_reports_last_partial_page() {
        let (_, items, _) = setup();
        let alice = identity("alice");
        for _ in 0..25 {
            items.create(&alice, lamp()).await.unwrap();
        }
        items.create(&identity("bob"), lamp()).await.unwrap();

        let page = items.list("alice", PageRequest::new(Some(10), Some(20))).await.unwrap();
        assert_eq!(page.page_size, 5);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current, 3);
    }

    #[tokio::test]
    async fn list_requires_owner() {
        let (_, _, posts) = setup();
        let err = posts.list("  ", PageRequest::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn post_update_with_empty_content_keeps_text() {
        let (_, _, posts) = setup();
        let alice = identity("alice");
        let post = posts
            .create(&alice, CreatePostInput { content: "hello".into() })
            .await
            .unwrap();

        let kept = posts
            .update(&alice, post.post_id, UpdatePostInput { content: Some(String::new()) })
            .await
            .unwrap();
        assert_eq!(kept.content, "hello");

        let changed = posts
            .update(&alice, post.post_id, UpdatePostInput { content: Some("edited".into()) })
            .await
            .unwrap();
        assert_eq!(changed.content, "edited");
    }
}
