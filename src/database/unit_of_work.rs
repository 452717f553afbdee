//! One transaction per service call.
//!
//! [`run`] begins a transaction, hands it to the caller's work, and then
//! performs exactly one terminal action on it:
//!
//! * work returned `Ok`  -> commit; a failed commit is returned as an error
//! * work returned `Err` -> rollback; the work's error is returned
//! * work panicked       -> rollback, then the panic continues unwinding
//!
//! If the surrounding request future is dropped mid-flight the transaction
//! handle is dropped unfinished and the backend rolls it back.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, error, warn};

use super::DatabaseError;

/// An open transaction. Both terminal actions consume the handle.
#[async_trait]
pub trait Transaction: Send + 'static {
    async fn commit(self) -> Result<(), DatabaseError>;
    async fn rollback(self) -> Result<(), DatabaseError>;
}

/// A backend that can open transactions.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    type Tx: Transaction;

    async fn begin(&self) -> Result<Self::Tx, DatabaseError>;

    /// Cheap connectivity probe for health checks.
    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// Run `work` inside a fresh transaction named `operation` (used in logs).
pub async fn run<D, T, E, F>(db: &D, operation: &str, work: F) -> Result<T, E>
where
    D: Database + ?Sized,
    T: Send,
    E: From<DatabaseError> + std::fmt::Display + Send,
    F: for<'t> FnOnce(&'t mut D::Tx) -> BoxFuture<'t, Result<T, E>> + Send,
{
    let mut tx = db.begin().await.map_err(|e| {
        error!(operation, "failed to begin transaction: {}", e);
        E::from(e)
    })?;

    let outcome = AssertUnwindSafe(work(&mut tx)).catch_unwind().await;

    match outcome {
        Ok(Ok(value)) => match tx.commit().await {
            Ok(()) => {
                debug!(operation, "transaction committed");
                Ok(value)
            }
            Err(e) => {
                error!(operation, "commit failed: {}", e);
                Err(E::from(e))
            }
        },
        Ok(Err(err)) => {
            debug!(operation, "rolling back: {}", err);
            if let Err(rollback_err) = tx.rollback().await {
                error!(operation, "rollback failed: {}", rollback_err);
            }
            Err(err)
        }
        Err(panic) => {
            warn!(operation, "work panicked, rolling back");
            match tx.rollback().await {
                Ok(()) => std::panic::resume_unwind(panic),
                Err(rollback_err) => {
                    error!(operation, "rollback after panic failed: {}", rollback_err);
                    panic!("{}: rollback after panic failed: {}", operation, rollback_err)
                }
            }
        }
    }
}
