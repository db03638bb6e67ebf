//! SQLite storage layer -- connection pool and schema.

pub mod schema;

use anyhow::{Context, Result};
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create database directory {}", parent.display()))?;
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager).with_context(|| format!("failed to open database {}", path))?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// An in-memory database behind a single-connection pool.
///
/// Every SQLite `:memory:` connection is its own database, so the pool is capped at one.
pub fn open_memory_pool() -> Result<Pool> {
    let manager = SqliteConnectionManager::memory();
    let pool = R2D2Pool::builder().max_size(1).build(manager)?;

    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}
