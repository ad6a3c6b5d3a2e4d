// src/db/mod.rs
// SQLite persistence for users, provider keys and model assignments.

pub mod crud;
pub mod models;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Connect to the database and make sure the schema exists.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to database: {}", database_url);
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid DATABASE_URL '{}'", database_url))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to open database")?;

    create_schema(&pool).await?;
    info!("Database connected and schema verified");
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            hashed_password TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS provider_keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            provider_name TEXT NOT NULL,
            encrypted_key TEXT NOT NULL,
            UNIQUE(user_id, provider_name)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS model_assignments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role_name TEXT NOT NULL,
            model_id TEXT NOT NULL,
            temperature REAL NOT NULL DEFAULT 0.7,
            UNIQUE(user_id, role_name)
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
