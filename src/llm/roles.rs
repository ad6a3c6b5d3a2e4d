// src/llm/roles.rs
// Immutable per-request map of agent roles to provider, model, temperature
// and decrypted API key, built once from the user's stored assignments.

use std::collections::HashMap;

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::crud;

pub const ROLE_PLANNER: &str = "planner";
pub const ROLE_CODER: &str = "coder";
pub const ROLE_CHAT: &str = "chat";

const FALLBACK_ORDER: &[&str] = &[ROLE_CODER, ROLE_PLANNER, ROLE_CHAT];

#[derive(Debug, Clone)]
pub struct RoleBinding {
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct RoleMap {
    bindings: HashMap<String, RoleBinding>,
}

impl RoleMap {
    pub fn from_bindings(bindings: HashMap<String, RoleBinding>) -> Self {
        Self { bindings }
    }

    /// Loads the user's role assignments and decrypts the provider key for
    /// each, producing the flattened map used for the rest of the request.
    pub async fn load(pool: &SqlitePool, user_id: i64, encryption_key: &str) -> Result<Self> {
        let assignments = crud::get_assignments_for_user(pool, user_id).await?;
        let mut bindings = HashMap::new();
        for assignment in assignments {
            let Some((provider, model)) = assignment.model_id.split_once('/') else {
                debug!(
                    "Skipping malformed model id '{}' for role '{}'",
                    assignment.model_id, assignment.role_name
                );
                continue;
            };
            let api_key =
                crud::get_decrypted_key_for_provider(pool, user_id, provider, encryption_key)
                    .await?;
            bindings.insert(
                assignment.role_name.clone(),
                RoleBinding {
                    provider: provider.to_string(),
                    model: model.to_string(),
                    temperature: assignment.temperature,
                    api_key,
                },
            );
        }
        Ok(Self { bindings })
    }

    /// Resolve the binding for a role, falling back through the other roles
    /// (coder, planner, chat) and finally any available binding.
    pub fn resolve(&self, role: &str) -> Option<&RoleBinding> {
        if let Some(binding) = self.bindings.get(role) {
            return Some(binding);
        }
        for fallback in FALLBACK_ORDER {
            if let Some(binding) = self.bindings.get(*fallback) {
                return Some(binding);
            }
        }
        self.bindings.values().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(provider: &str, model: &str) -> RoleBinding {
        RoleBinding {
            provider: provider.into(),
            model: model.into(),
            temperature: 0.7,
            api_key: Some("sk-test".into()),
        }
    }

    #[test]
    fn resolves_direct_then_fallback() {
        let mut bindings = HashMap::new();
        bindings.insert("planner".to_string(), binding("openai", "gpt-4o"));
        let roles = RoleMap::from_bindings(bindings);

        assert_eq!(roles.resolve("planner").unwrap().model, "gpt-4o");
        // 'coder' missing: falls back to planner.
        assert_eq!(roles.resolve("coder").unwrap().model, "gpt-4o");
        assert!(RoleMap::default().resolve("coder").is_none());
    }
}
