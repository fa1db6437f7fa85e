//! Credential provider: where the API key used for every provider call comes from.
//!
//! Selection is user-driven and asynchronous: `prompt_for_credential()` only asks for a key,
//! it never waits for one. Callers proceed optimistically and learn the outcome from the
//! next provider call.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn has_credential(&self) -> bool;

    /// Starts the key-selection flow. Returns without observing its outcome.
    async fn prompt_for_credential(&self);

    async fn api_key(&self) -> Option<String>;
}

/// In-memory key slot seeded from config and completed through `PUT /api/v1/credential`.
#[derive(Debug, Default)]
pub struct KeyStore {
    key: RwLock<Option<String>>,
    selection_requested: AtomicBool,
}

impl KeyStore {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            key: RwLock::new(initial.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())),
            selection_requested: AtomicBool::new(false),
        }
    }

    /// Stores a user-selected key and closes any outstanding selection request.
    /// Returns false (and keeps the old key) when `key` is blank.
    pub async fn select_key(&self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }
        *self.key.write().await = Some(key.to_string());
        self.selection_requested.store(false, Ordering::SeqCst);
        info!("API key selected");
        true
    }

    pub fn selection_requested(&self) -> bool {
        self.selection_requested.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for KeyStore {
    async fn has_credential(&self) -> bool {
        self.key.read().await.is_some()
    }

    async fn prompt_for_credential(&self) {
        self.selection_requested.store(true, Ordering::SeqCst);
        warn!("API key selection requested, waiting for PUT /api/v1/credential");
    }

    async fn api_key(&self) -> Option<String> {
        self.key.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_initial_key_counts_as_missing() {
        let store = KeyStore::new(Some("   ".to_string()));
        assert!(!store.has_credential().await);
        assert!(store.api_key().await.is_none());
    }

    #[tokio::test]
    async fn test_prompt_then_select_clears_request() {
        let store = KeyStore::new(None);
        store.prompt_for_credential().await;
        assert!(store.selection_requested());

        assert!(store.select_key(" AIzaTestKey ").await);
        assert!(!store.selection_requested());
        assert_eq!(store.api_key().await.as_deref(), Some("AIzaTestKey"));
    }

    #[tokio::test]
    async fn test_blank_selection_keeps_previous_key() {
        let store = KeyStore::new(Some("AIzaOld".to_string()));
        assert!(!store.select_key("").await);
        assert_eq!(store.api_key().await.as_deref(), Some("AIzaOld"));
    }
}
