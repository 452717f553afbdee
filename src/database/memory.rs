//! In-process backend with the same transactional contract as Postgres.
//!
//! `begin` clones the committed tables into a private snapshot. Repositories
//! read and write that snapshot (so a transaction sees its own writes) and log
//! every write. `commit` replays the log onto the shared tables under one write
//! lock; `rollback` or dropping the handle discards it. Concurrent writers to
//! the same row resolve last-commit-wins, and an update or delete of a row
//! that another transaction removed in the meantime affects nothing.
//!
//! Commit and rollback failures can be injected to exercise the unit of work.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::models::{Item, Post, Resource, User};
use super::repository::{ResourceRepository, UserRepository};
use super::unit_of_work::{Database, Transaction};
use super::DatabaseError;
use crate::types::{PageRequest, ResourceKey};

#[derive(Debug, Clone, Default)]
pub struct Tables {
    users: HashMap<Uuid, User>,
    items: HashMap<Uuid, Item>,
    posts: HashMap<Uuid, Post>,
}

#[derive(Debug, Clone)]
pub enum Op<R> {
    Insert(R),
    Update(R),
    Delete(Uuid),
}

#[derive(Debug, Clone)]
pub enum Write {
    User(Op<User>),
    Item(Op<Item>),
    Post(Op<Post>),
}

/// Row types that live in [`Tables`].
pub trait MemoryRow: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn table(tables: &Tables) -> &HashMap<Uuid, Self>;
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self>;
    fn wrap(op: Op<Self>) -> Write;
}

impl MemoryRow for User {
    fn id(&self) -> Uuid {
        self.user_id
    }
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.users
    }
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.users
    }
    fn wrap(op: Op<Self>) -> Write {
        Write::User(op)
    }
}

impl MemoryRow for Item {
    fn id(&self) -> Uuid {
        self.item_id
    }
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.items
    }
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.items
    }
    fn wrap(op: Op<Self>) -> Write {
        Write::Item(op)
    }
}

impl MemoryRow for Post {
    fn id(&self) -> Uuid {
        self.post_id
    }
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.posts
    }
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.posts
    }
    fn wrap(op: Op<Self>) -> Write {
        Write::Post(op)
    }
}

impl<R: MemoryRow> Op<R> {
    fn apply(self, tables: &mut Tables) {
        let table = R::table_mut(tables);
        match self {
            Op::Insert(row) => {
                table.insert(row.id(), row);
            }
            Op::Update(row) => {
                if let Some(slot) = table.get_mut(&row.id()) {
                    *slot = row;
                }
            }
            Op::Delete(id) => {
                table.remove(&id);
            }
        }
    }
}

impl Write {
    fn apply(self, tables: &mut Tables) {
        match self {
            Write::User(op) => op.apply(tables),
            Write::Item(op) => op.apply(tables),
            Write::Post(op) => op.apply(tables),
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    /// Absolute commit attempt numbers (1-based) that must fail.
    failing_commits: HashSet<usize>,
    failing_rollbacks: usize,
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    faults: Mutex<Faults>,
    commit_attempts: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub commits: usize,
    pub rollbacks: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th commit attempt after this call fail (1 = the next one).
    pub async fn fail_nth_commit(&self, n: usize) {
        let target = self.shared.commit_attempts.load(Ordering::SeqCst) + n.max(1);
        self.shared.faults.lock().await.failing_commits.insert(target);
    }

    /// Make the next `n` rollbacks fail.
    pub async fn fail_next_rollbacks(&self, n: usize) {
        self.shared.faults.lock().await.failing_rollbacks += n;
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            commits: self.shared.commits.load(Ordering::SeqCst),
            rollbacks: self.shared.rollbacks.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, DatabaseError> {
        let snapshot = self.shared.tables.read().await.clone();
        Ok(MemoryTx {
            shared: Arc::clone(&self.shared),
            snapshot,
            writes: Vec::new(),
            finished: false,
        })
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub struct MemoryTx {
    shared: Arc<Shared>,
    snapshot: Tables,
    writes: Vec<Write>,
    finished: bool,
}

impl MemoryTx {
    fn record<R: MemoryRow>(&mut self, op: Op<R>) {
        self.writes.push(R::wrap(op));
    }
}

fn check_unique_users(tables: &Tables, writes: &[Write]) -> Result<(), DatabaseError> {
    for write in writes {
        if let Write::User(Op::Insert(user)) = write {
            let taken = tables
                .users
                .values()
                .any(|u| u.username == user.username || u.email == user.email);
            if taken {
                return Err(DatabaseError::Conflict("username or email already exists".to_string()));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Transaction for MemoryTx {
    async fn commit(mut self) -> Result<(), DatabaseError> {
        self.finished = true;
        let attempt = self.shared.commit_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.shared.faults.lock().await.failing_commits.remove(&attempt) {
            return Err(DatabaseError::Transaction(format!(
                "injected failure on commit attempt {}",
                attempt
            )));
        }

        let writes = std::mem::take(&mut self.writes);
        let mut tables = self.shared.tables.write().await;
        check_unique_users(&tables, &writes)?;
        for write in writes {
            write.apply(&mut tables);
        }
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), DatabaseError> {
        self.finished = true;
        {
            let mut faults = self.shared.faults.lock().await;
            if faults.failing_rollbacks > 0 {
                faults.failing_rollbacks -= 1;
                return Err(DatabaseError::Transaction("injected rollback failure".to_string()));
            }
        }
        self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            debug!("transaction dropped unfinished, discarding {} writes", self.writes.len());
            self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryUserRepository;

#[async_trait]
impl UserRepository<MemoryTx> for MemoryUserRepository {
    async fn insert(&self, tx: &mut MemoryTx, user: &User) -> Result<(), DatabaseError> {
        check_unique_users(&tx.snapshot, &[Write::User(Op::Insert(user.clone()))])?;
        tx.snapshot.users.insert(user.user_id, user.clone());
        tx.record(Op::Insert(user.clone()));
        Ok(())
    }

    async fn find_by_username(&self, tx: &mut MemoryTx, username: &str) -> Result<Option<User>, DatabaseError> {
        Ok(tx.snapshot.users.values().find(|u| u.username == username).cloned())
    }
}

/// Generic resource repository over the in-memory tables.
#[derive(Debug)]
pub struct MemoryRepository<R> {
    _row: PhantomData<fn() -> R>,
}

impl<R> MemoryRepository<R> {
    pub fn new() -> Self {
        Self { _row: PhantomData }
    }
}

impl<R> Default for MemoryRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for MemoryRepository<R> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

fn owned_by<R: Resource>(row: &R, owner: &str) -> bool {
    row.key().owner == owner
}

#[async_trait]
impl<R> ResourceRepository<MemoryTx, R> for MemoryRepository<R>
where
    R: Resource + MemoryRow,
{
    async fn insert(&self, tx: &mut MemoryTx, row: &R) -> Result<(), DatabaseError> {
        let table = R::table_mut(&mut tx.snapshot);
        if table.contains_key(&row.id()) {
            return Err(DatabaseError::Conflict(format!("{} already exists", R::KIND)));
        }
        table.insert(row.id(), row.clone());
        tx.record(Op::Insert(row.clone()));
        Ok(())
    }

    async fn find(&self, tx: &mut MemoryTx, key: &ResourceKey) -> Result<Option<R>, DatabaseError> {
        Ok(R::table(&tx.snapshot)
            .get(&key.id)
            .filter(|row| owned_by(*row, &key.owner))
            .cloned())
    }

    async fn count_by_owner(&self, tx: &mut MemoryTx, owner: &str) -> Result<i64, DatabaseError> {
        let count = R::table(&tx.snapshot)
            .values()
            .filter(|row| owned_by(*row, owner))
            .count();
        Ok(count as i64)
    }

    async fn list_by_owner(&self, tx: &mut MemoryTx, owner: &str, page: PageRequest) -> Result<Vec<R>, DatabaseError> {
        let mut rows: Vec<&R> = R::table(&tx.snapshot)
            .values()
            .filter(|row| owned_by(*row, owner))
            .collect();
        rows.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        Ok(rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect())
    }

    async fn update(&self, tx: &mut MemoryTx, row: &R) -> Result<bool, DatabaseError> {
        let key = row.key();
        match R::table_mut(&mut tx.snapshot).get_mut(&key.id) {
            Some(slot) if owned_by(slot, &key.owner) => {
                *slot = row.clone();
            }
            _ => return Ok(false),
        }
        tx.record(Op::Update(row.clone()));
        Ok(true)
    }

    async fn delete(&self, tx: &mut MemoryTx, key: &ResourceKey) -> Result<bool, DatabaseError> {
        let table = R::table_mut(&mut tx.snapshot);
        let owned = table.get(&key.id).map(|row| owned_by(row, &key.owner)).unwrap_or(false);
        if !owned {
            return Ok(false);
        }
        table.remove(&key.id);
        tx.record::<R>(Op::Delete(key.id));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::VerifiedIdentity;
    use crate::database::models::{CreatePostInput, Resource};
    use chrono::{Duration, Utc};

    fn post(owner: &VerifiedIdentity, text: &str, minutes_ago: i64) -> Post {
        Post::build(
            CreatePostInput { content: text.into() },
            owner,
            Utc::now() - Duration::minutes(minutes_ago),
        )
    }

    #[tokio::test]
    async fn uncommitted_writes_are_private() {
        let db = MemoryDatabase::new();
        let repo = MemoryRepository::<Post>::new();
        let alice = VerifiedIdentity::new(Uuid::new_v4(), "alice".into());

        let mut writer = db.begin().await.unwrap();
        repo.insert(&mut writer, &post(&alice, "draft", 0)).await.unwrap();
        assert_eq!(repo.count_by_owner(&mut writer, "alice").await.unwrap(), 1);

        let mut reader = db.begin().await.unwrap();
        assert_eq!(repo.count_by_owner(&mut reader, "alice").await.unwrap(), 0);

        writer.commit().await.unwrap();
        reader.rollback().await.unwrap();

        let mut after = db.begin().await.unwrap();
        assert_eq!(repo.count_by_owner(&mut after, "alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dropped_transaction_counts_as_rollback() {
        let db = MemoryDatabase::new();
        let repo = MemoryRepository::<Post>::new();
        let alice = VerifiedIdentity::new(Uuid::new_v4(), "alice".into());
        {
            let mut tx = db.begin().await.unwrap();
            repo.insert(&mut tx, &post(&alice, "abandoned", 0)).await.unwrap();
        }
        assert_eq!(db.stats().rollbacks, 1);

        let mut tx = db.begin().await.unwrap();
        assert_eq!(repo.count_by_owner(&mut tx, "alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lists_newest_first_and_scopes_by_owner() {
        let db = MemoryDatabase::new();
        let repo = MemoryRepository::<Post>::new();
        let alice = VerifiedIdentity::new(Uuid::new_v4(), "alice".into());
        let bob = VerifiedIdentity::new(Uuid::new_v4(), "bob".into());

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &post(&alice, "old", 30)).await.unwrap();
        repo.insert(&mut tx, &post(&alice, "new", 1)).await.unwrap();
        repo.insert(&mut tx, &post(&bob, "other", 0)).await.unwrap();

        let rows = repo.list_by_owner(&mut tx, "alice", PageRequest::default()).await.unwrap();
        let texts: Vec<_> = rows.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(texts, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn foreign_owner_cannot_touch_row() {
        let db = MemoryDatabase::new();
        let repo = MemoryRepository::<Post>::new();
        let alice = VerifiedIdentity::new(Uuid::new_v4(), "alice".into());
        let row = post(&alice, "mine", 0);

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &row).await.unwrap();

        let foreign = ResourceKey::new(row.post_id, "mallory");
        assert!(repo.find(&mut tx, &foreign).await.unwrap().is_none());
        assert!(!repo.delete(&mut tx, &foreign).await.unwrap());

        let mut hijacked = row.clone();
        hijacked.owner = "mallory".into();
        hijacked.content = "stolen".into();
        assert!(!repo.update(&mut tx, &hijacked).await.unwrap());

        let stored = repo.find(&mut tx, &row.key()).await.unwrap().unwrap();
        assert_eq!(stored.content, "mine");
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_across_transactions() {
        let db = MemoryDatabase::new();
        let repo = MemoryUserRepository;
        let now = Utc::now();
        let user = |email: &str| User {
            user_id: Uuid::new_v4(),
            username: "dupe".into(),
            email: email.into(),
            password_hash: "x".into(),
            created_at: now,
            updated_at: now,
        };

        let mut first = db.begin().await.unwrap();
        let mut second = db.begin().await.unwrap();
        repo.insert(&mut first, &user("a@example.com")).await.unwrap();
        repo.insert(&mut second, &user("b@example.com")).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(DatabaseError::Conflict(_))));
    }
}
