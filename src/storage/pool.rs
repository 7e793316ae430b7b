//! Database connection pool management.
//!
//! Initializes the SQLite connection pool with WAL mode enabled for
//! concurrent access, creating the database file if it does not exist.

use std::fs::OpenOptions;
use std::io::ErrorKind;

use log::{error, info};
use sqlx::SqlitePool;

use crate::error_handling::StoreError;

/// Initializes and returns a database connection pool for an explicit path.
///
/// Creates the database file if it doesn't exist and enables WAL mode so the
/// poll worker can write while the pipeline and API layer read.
pub async fn init_db_pool_with_path(db_path: &std::path::Path) -> Result<SqlitePool, StoreError> {
    let db_path_str = db_path.to_string_lossy().to_string();
    match OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&db_path_str)
    {
        Ok(_) => info!("Database file created successfully."),
        Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
            info!("Database file already exists.")
        }
        Err(e) => {
            error!("Failed to create database file: {e}");
            return Err(StoreError::FileCreationError(e.to_string()));
        }
    }

    let pool = SqlitePool::connect(&format!("sqlite:{}", db_path_str))
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {e}");
            StoreError::SqlError(e)
        })?;

    // Enable WAL mode
    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await
        .map_err(|e| {
            error!("Failed to set WAL mode: {e}");
            StoreError::SqlError(e)
        })?;

    Ok(pool)
}
