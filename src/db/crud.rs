// src/db/crud.rs
// Database operations for users, provider keys and model assignments.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use super::models::{ModelAssignment, ProviderKey, User};
use crate::auth::crypto;

// =========================================================================
// Users
// =========================================================================

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, hashed_password FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| User {
        id: r.get("id"),
        email: r.get("email"),
        hashed_password: r.get("hashed_password"),
    }))
}

pub async fn get_user_by_id(pool: &SqlitePool, user_id: i64) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, hashed_password FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| User {
        id: r.get("id"),
        email: r.get("email"),
        hashed_password: r.get("hashed_password"),
    }))
}

pub async fn create_user(pool: &SqlitePool, email: &str, hashed_password: &str) -> Result<User> {
    let id = sqlx::query("INSERT INTO users (email, hashed_password, created_at) VALUES (?, ?, ?)")
        .bind(email)
        .bind(hashed_password)
        .bind(chrono::Utc::now().timestamp())
        .execute(pool)
        .await?
        .last_insert_rowid();

    Ok(User {
        id,
        email: email.to_string(),
        hashed_password: hashed_password.to_string(),
    })
}

// =========================================================================
// Provider keys
// =========================================================================

pub async fn get_provider_keys_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<ProviderKey>> {
    let rows = sqlx::query(
        "SELECT user_id, provider_name, encrypted_key FROM provider_keys WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| ProviderKey {
            user_id: r.get("user_id"),
            provider_name: r.get("provider_name"),
            encrypted_key: r.get("encrypted_key"),
        })
        .collect())
}

/// Creates or replaces a provider key, encrypting the API key at rest.
pub async fn upsert_provider_key(
    pool: &SqlitePool,
    user_id: i64,
    provider_name: &str,
    api_key: &str,
    encryption_key: &str,
) -> Result<()> {
    let encrypted = crypto::encrypt(api_key.as_bytes(), encryption_key)?;
    sqlx::query(
        "INSERT INTO provider_keys (user_id, provider_name, encrypted_key)
         VALUES (?, ?, ?)
         ON CONFLICT(user_id, provider_name) DO UPDATE SET encrypted_key = excluded.encrypted_key",
    )
    .bind(user_id)
    .bind(provider_name)
    .bind(&encrypted)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_provider_key(
    pool: &SqlitePool,
    user_id: i64,
    provider_name: &str,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM provider_keys WHERE user_id = ? AND provider_name = ?")
        .bind(user_id)
        .bind(provider_name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetches and decrypts a specific provider key for a user, ready for use.
pub async fn get_decrypted_key_for_provider(
    pool: &SqlitePool,
    user_id: i64,
    provider_name: &str,
    encryption_key: &str,
) -> Result<Option<String>> {
    let row = sqlx::query(
        "SELECT encrypted_key FROM provider_keys WHERE user_id = ? AND provider_name = ?",
    )
    .bind(user_id)
    .bind(provider_name)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => {
            let encrypted: String = r.get("encrypted_key");
            let plaintext = crypto::decrypt(&encrypted, encryption_key)?;
            Ok(Some(String::from_utf8(plaintext)?))
        }
        None => Ok(None),
    }
}

// =========================================================================
// Model assignments
// =========================================================================

pub async fn get_assignments_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<ModelAssignment>> {
    let rows = sqlx::query(
        "SELECT role_name, model_id, temperature FROM model_assignments WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| ModelAssignment {
            role_name: r.get("role_name"),
            model_id: r.get("model_id"),
            temperature: r.get("temperature"),
        })
        .collect())
}

/// Replaces the set of assignments for a user, one upsert per role.
pub async fn upsert_assignments_for_user(
    pool: &SqlitePool,
    user_id: i64,
    assignments: &[ModelAssignment],
) -> Result<()> {
    for assignment in assignments {
        sqlx::query(
            "INSERT INTO model_assignments (user_id, role_name, model_id, temperature)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, role_name)
             DO UPDATE SET model_id = excluded.model_id, temperature = excluded.temperature",
        )
        .bind(user_id)
        .bind(&assignment.role_name)
        .bind(&assignment.model_id)
        .bind(assignment.temperature)
        .execute(pool)
        .await?;
    }
    Ok(())
}
