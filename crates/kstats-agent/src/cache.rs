//! Volume label cache shared across collection cycles

use kstats_core::Labels;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Cache key for one volume of one pod
pub fn volume_cache_key(pod_uid: &str, volume_name: &str) -> String {
    format!("{}/{}", pod_uid, volume_name)
}

/// Resolved storage labels keyed by [`volume_cache_key`].
///
/// Entries are never evicted or replaced: the first labels stored for a key
/// stay authoritative for the lifetime of the process.
#[derive(Debug, Default)]
pub struct VolumeLabelCache {
    entries: RwLock<HashMap<String, Labels>>,
}

impl VolumeLabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Labels> {
        self.entries.read().await.get(key).cloned()
    }

    /// Populate `key` unless another cycle already did, and return the labels
    /// now stored for it.
    pub async fn put(&self, key: impl Into<String>, labels: Labels) -> Labels {
        let key = key.into();
        let mut entries = self.entries.write().await;
        let stored = entries.entry(key).or_insert_with(|| labels).clone();
        debug!("Volume label cache holds {} entries", entries.len());
        stored
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_volume_cache_key() {
        assert_eq!(volume_cache_key("uid-1", "data"), "uid-1/data");
    }

    #[tokio::test]
    async fn test_get_and_put() {
        let cache = VolumeLabelCache::new();
        assert!(cache.is_empty().await);
        assert!(cache.get("uid-1/data").await.is_none());

        let labels = Labels::new().with("zone", "us-east-1a");
        let stored = cache.put("uid-1/data", labels.clone()).await;

        assert_eq!(stored, labels);
        assert_eq!(cache.get("uid-1/data").await, Some(labels));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_first_population_wins() {
        let cache = VolumeLabelCache::new();
        cache.put("uid-1/data", Labels::new().with("zone", "a")).await;

        let stored = cache.put("uid-1/data", Labels::new().with("zone", "b")).await;
        assert_eq!(stored.get("zone"), Some("a"));
        assert_eq!(cache.get("uid-1/data").await.unwrap().get("zone"), Some("a"));
    }

    #[tokio::test]
    async fn test_concurrent_population() {
        let cache = Arc::new(VolumeLabelCache::new());

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let labels = Labels::new().with("writer", i.to_string()).with("zone", "a");
                cache.put("uid-1/data", labels).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        // Every writer observes the same complete entry
        let stored = cache.get("uid-1/data").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(results.iter().all(|labels| *labels == stored));
        assert_eq!(cache.len().await, 1);
    }
}
