//! In-memory store: useful for testing and the local `chat` command.

use async_trait::async_trait;
use prodops_core::error::StorageError;
use prodops_core::memory::{MemoryStore, UserMemory};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps one snapshot per user in a map. Nothing survives a restart.
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<i64, UserMemory>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of users with a stored snapshot.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, user_id: i64) -> Result<UserMemory, StorageError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, user_id: i64, memory: &UserMemory) -> Result<(), StorageError> {
        self.entries.write().await.insert(user_id, memory.clone());
        Ok(())
    }
}
