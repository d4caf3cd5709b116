pub mod db;
pub mod models;
pub mod repositories;

pub use sqlx;

pub use db::{connect, DbError};
pub use models::user::{UserAccount, Verification};
pub use repositories::{LedgerStore, MemoryLedger, PgLedger};
