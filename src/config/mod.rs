// src/config/mod.rs
// Central configuration for the Aura backend, loaded from the environment.

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Application settings loaded from environment variables (and `.env` when
/// present). Required values are verified by [`AppConfig::validate`] before
/// the server starts; a missing value aborts startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub llm_server_url: String,
    pub jwt_secret_key: String,
    pub encryption_key: String,
    pub beta_access_key: String,
    pub database_url: String,
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
    pub workspaces_root: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        // Don't panic if .env doesn't exist (for production)
        dotenv::dotenv().ok();

        Self {
            port: env_or("PORT", "8080").parse().unwrap_or(8080),
            llm_server_url: env_or("LLM_SERVER_URL", ""),
            jwt_secret_key: env_or("JWT_SECRET_KEY", ""),
            encryption_key: env_or("ENCRYPTION_KEY", ""),
            beta_access_key: env_or("BETA_ACCESS_KEY", ""),
            database_url: env_or("DATABASE_URL", ""),
            algorithm: env_or("ALGORITHM", "HS256"),
            access_token_expire_minutes: env_or("ACCESS_TOKEN_EXPIRE_MINUTES", "30")
                .parse()
                .unwrap_or(30),
            workspaces_root: PathBuf::from(env_or("WORKSPACES_ROOT", "./workspaces")),
        }
    }

    /// Validate config on startup. Lists every missing variable so a broken
    /// deployment fails loudly instead of limping along without credentials.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.llm_server_url.is_empty() {
            missing.push("LLM_SERVER_URL");
        }
        if self.jwt_secret_key.is_empty() {
            missing.push("JWT_SECRET_KEY");
        }
        if self.encryption_key.is_empty() {
            missing.push("ENCRYPTION_KEY");
        }
        if self.beta_access_key.is_empty() {
            missing.push("BETA_ACCESS_KEY");
        }
        if self.database_url.is_empty() {
            missing.push("DATABASE_URL");
        }
        if !missing.is_empty() {
            bail!(
                "missing required environment variables: {}",
                missing.join(", ")
            );
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> AppConfig {
        AppConfig {
            port: 8080,
            llm_server_url: "http://localhost:9000".into(),
            jwt_secret_key: "secret".into(),
            encryption_key: "key".into(),
            beta_access_key: "beta".into(),
            database_url: "sqlite::memory:".into(),
            algorithm: "HS256".into(),
            access_token_expire_minutes: 30,
            workspaces_root: PathBuf::from("./workspaces"),
        }
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(populated().validate().is_ok());
    }

    #[test]
    fn validate_lists_every_missing_variable() {
        let mut config = populated();
        config.jwt_secret_key.clear();
        config.database_url.clear();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("JWT_SECRET_KEY"));
        assert!(err.contains("DATABASE_URL"));
        assert!(!err.contains("BETA_ACCESS_KEY"));
    }
}
