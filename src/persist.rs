//! Persistence collaborator
//!
//! Finished jobs hand their encoded content to a [`ContentStore`]; readers
//! that attach after a job finished are served from it. Durable stores live
//! outside this crate. [`MemoryStore`] keeps everything in a map and is what
//! tests and the demo use.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::RwLock;

use crate::registry::JobId;

/// Error reported by a content store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Key-value persistence for finished job content
pub trait ContentStore: Send + Sync + 'static {
    /// Store the finished content of a job
    fn save(
        &self,
        job: JobId,
        content: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Load the finished content of a job, if stored
    fn load(&self, job: JobId) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;
}

/// In-memory content store
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: RwLock<HashMap<JobId, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs
    pub async fn len(&self) -> usize {
        self.contents.read().await.len()
    }

    /// Check if nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.contents.read().await.is_empty()
    }
}

impl ContentStore for MemoryStore {
    async fn save(&self, job: JobId, content: String) -> Result<(), StoreError> {
        self.contents.write().await.insert(job, content);
        Ok(())
    }

    async fn load(&self, job: JobId) -> Result<Option<String>, StoreError> {
        Ok(self.contents.read().await.get(&job).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        store.save(JobId(1), "pages".to_string()).await.unwrap();

        assert_eq!(store.load(JobId(1)).await.unwrap().as_deref(), Some("pages"));
        assert_eq!(store.load(JobId(2)).await.unwrap(), None);
        assert_eq!(store.len().await, 1);
    }
}
