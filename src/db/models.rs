// src/db/models.rs
// Row types for the backing database.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
}

#[derive(Debug, Clone)]
pub struct ProviderKey {
    pub user_id: i64,
    pub provider_name: String,
    pub encrypted_key: String,
}

/// A user's binding of a model (and temperature) to an agent role.
/// `model_id` is a `provider/model` pair, e.g. `"openai/gpt-4o"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelAssignment {
    pub role_name: String,
    pub model_id: String,
    pub temperature: f64,
}
