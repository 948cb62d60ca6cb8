//! Cached quality-label vocabulary.
//!
//! The catalog is owned by whoever constructs it and passed explicitly to
//! the code that needs it. Entries expire after the TTL or on
//! [`LabelCatalog::invalidate`].

use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::models::QualityLabel;
use crate::traits::LabelRepository;

struct Cached {
    loaded_at: Instant,
    labels: Vec<QualityLabel>,
}

/// TTL cache over [`LabelRepository::list_quality_labels`].
pub struct LabelCatalog {
    ttl: Duration,
    state: RwLock<Option<Cached>>,
}

impl LabelCatalog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(None),
        }
    }

    /// Catalog using `AVO_LABEL_CACHE_TTL_SECS` or the default TTL.
    pub fn from_env() -> Self {
        let ttl = std::env::var("AVO_LABEL_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(crate::defaults::LABEL_CACHE_TTL_SECS);
        Self::new(Duration::from_secs(ttl))
    }

    /// The vocabulary, loading it through `repo` when absent or expired.
    pub async fn labels(&self, repo: &dyn LabelRepository) -> Result<Vec<QualityLabel>> {
        {
            let state = self.state.read().await;
            if let Some(cached) = state.as_ref() {
                if cached.loaded_at.elapsed() < self.ttl {
                    return Ok(cached.labels.clone());
                }
            }
        }

        let mut state = self.state.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(cached) = state.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(cached.labels.clone());
            }
        }

        let labels = repo.list_quality_labels().await?;
        debug!(count = labels.len(), "Loaded quality-label vocabulary");
        *state = Some(Cached {
            loaded_at: Instant::now(),
            labels: labels.clone(),
        });
        Ok(labels)
    }

    /// Whether `value` is part of the vocabulary.
    pub async fn contains(&self, repo: &dyn LabelRepository, value: &str) -> Result<bool> {
        Ok(self.labels(repo).await?.iter().any(|l| l.value == value))
    }

    /// Drop the cached vocabulary; the next read reloads it.
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Default)]
    struct CountingRepo {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl LabelRepository for CountingRepo {
        async fn list_quality_labels(&self) -> Result<Vec<QualityLabel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![QualityLabel {
                value: "EXEMPLARY".to_string(),
                description: None,
            }])
        }

        async fn add_labels(&self, _collection_id: Uuid, _labels: &[String]) -> Result<()> {
            Ok(())
        }

        async fn remove_labels(&self, _collection_id: Uuid, _labels: &[String]) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_catalog_caches_until_ttl() {
        let repo = CountingRepo::default();
        let catalog = LabelCatalog::new(Duration::from_secs(60));

        catalog.labels(&repo).await.unwrap();
        catalog.labels(&repo).await.unwrap();
        assert_eq!(repo.loads.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        catalog.labels(&repo).await.unwrap();
        assert_eq!(repo.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let repo = CountingRepo::default();
        let catalog = LabelCatalog::new(Duration::from_secs(3600));

        assert!(catalog.contains(&repo, "EXEMPLARY").await.unwrap());
        catalog.invalidate().await;
        assert!(!catalog.contains(&repo, "UNKNOWN").await.unwrap());
        assert_eq!(repo.loads.load(Ordering::SeqCst), 2);
    }
}
