use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use crate::client::StateStore;
use pkg_constants::state::SECRETS_PREFIX;
use pkg_types::secret::Secret;

/// Opaque labelled blob store holding the CA material.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Fetch the content of the secret with `label`, or `None` if no such secret exists.
    /// With `refresh` set the backend must return its latest content, never a cached copy.
    async fn get_by_label(
        &self,
        label: &str,
        refresh: bool,
    ) -> Result<Option<BTreeMap<String, String>>>;

    /// Create a secret under `label` and return its id.
    /// Fails if a secret with that label already exists.
    async fn create(&self, label: &str, content: BTreeMap<String, String>) -> Result<String>;
}

/// [`SecretBackend`] over the SlateDB state store.
#[derive(Clone)]
pub struct StoreSecrets {
    store: StateStore,
}

impl StoreSecrets {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    fn key(label: &str) -> String {
        format!("{}{}", SECRETS_PREFIX, label)
    }
}

#[async_trait]
impl SecretBackend for StoreSecrets {
    async fn get_by_label(
        &self,
        label: &str,
        _refresh: bool,
    ) -> Result<Option<BTreeMap<String, String>>> {
        // Every read goes to the store, so refreshed and plain reads are the same.
        let secret: Option<Secret> = self.store.get_json(&Self::key(label)).await?;
        Ok(secret.map(|s| s.content))
    }

    async fn create(&self, label: &str, content: BTreeMap<String, String>) -> Result<String> {
        let key = Self::key(label);
        if self.store.get(&key).await?.is_some() {
            bail!("secret with label '{}' already exists", label);
        }

        let secret = Secret {
            id: Uuid::new_v4().to_string(),
            label: label.to_string(),
            content,
            created_at: Utc::now(),
        };
        self.store.put_json(&key, &secret).await?;

        info!("Created secret {} (label={})", secret.id, label);
        Ok(secret.id)
    }
}
