pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;
pub mod unit_of_work;

pub use manager::{DatabaseError, PgDatabase, PgTx};
pub use memory::{MemoryDatabase, MemoryRepository, MemoryUserRepository};
pub use unit_of_work::{Database, Transaction};
