// src/auth/jwt.rs

use anyhow::{anyhow, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::AppConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub exp: usize, // expiration timestamp
    pub iat: usize, // issued at timestamp
}

fn algorithm(config: &AppConfig) -> Algorithm {
    Algorithm::from_str(&config.algorithm).unwrap_or(Algorithm::HS256)
}

pub fn create_token(config: &AppConfig, user_id: i64, email: &str) -> Result<String> {
    let now = chrono::Utc::now();
    let expiration = now
        .checked_add_signed(chrono::Duration::minutes(config.access_token_expire_minutes))
        .ok_or_else(|| anyhow!("failed to calculate token expiration"))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: expiration,
        iat: now.timestamp() as usize,
    };

    let header = Header::new(algorithm(config));
    let key = EncodingKey::from_secret(config.jwt_secret_key.as_bytes());

    encode(&header, &claims, &key).map_err(|e| anyhow!("failed to create token: {}", e))
}

pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims> {
    let key = DecodingKey::from_secret(config.jwt_secret_key.as_bytes());
    let validation = Validation::new(algorithm(config));

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| anyhow!("invalid token: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            port: 8080,
            llm_server_url: "http://localhost:9000".into(),
            jwt_secret_key: "unit-test-secret".into(),
            encryption_key: "unit-test-encryption".into(),
            beta_access_key: "beta".into(),
            database_url: "sqlite::memory:".into(),
            algorithm: "HS256".into(),
            access_token_expire_minutes: 30,
            workspaces_root: "./workspaces".into(),
        }
    }

    #[test]
    fn token_round_trip() {
        let config = test_config();
        let token = create_token(&config, 42, "dev@example.com").unwrap();
        let claims = verify_token(&config, &token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "dev@example.com");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = test_config();
        let token = create_token(&config, 42, "dev@example.com").unwrap();
        let mut other = test_config();
        other.jwt_secret_key = "a-different-secret".into();
        assert!(verify_token(&other, &token).is_err());
    }
}
