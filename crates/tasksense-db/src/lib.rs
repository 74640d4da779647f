//! TaskSense Database Layer
//!
//! SQLite persistence for tasks, their activity log and the AI summaries
//! derived from it. All access goes through a [`DbPool`] and the plain
//! query functions in [`queries`].

pub mod migrations;
pub mod pool;
pub mod queries;

pub use pool::{format_timestamp, now_timestamp, DbError, DbPool, DbResult};

use std::path::Path;

/// Open (or create) the database file and bring its schema up to date.
pub fn init_pool(path: &Path) -> DbResult<DbPool> {
    let pool = DbPool::open(path)?;
    migrations::run_migrations(&pool)?;
    Ok(pool)
}

/// Create a migrated in-memory database. Used by tests.
pub fn init_in_memory() -> DbResult<DbPool> {
    let pool = DbPool::in_memory()?;
    migrations::run_migrations(&pool)?;
    Ok(pool)
}
