use async_trait::async_trait;
use cidfeed_common::ConditionalSync;
use std::{collections::HashMap, convert::Infallible, sync::Arc};
use tokio::sync::RwLock;

/// Persistence collaborator: opaque string blobs stored under logical keys.
///
/// The engine never interprets a storage failure beyond reporting it; what a
/// blob contains is decided by [`crate::SecurityState`].
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait StateStore: ConditionalSync {
    /// The error type produced by this store
    type Error: std::error::Error + Send + Sync + 'static;

    /// Retrieve the blob (if any) stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;
    /// Store `value` under `key`, replacing any previous blob
    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error>;
    /// Forget whatever is stored under `key`
    async fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

/// A [`StateStore`] backed by a [`HashMap`]; nothing outlives the process.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStateStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl StateStore for MemoryStateStore {
    type Error = Infallible;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}
