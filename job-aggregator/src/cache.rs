//! TTL cache of aggregation results keyed by canonicalized search parameters.
//!
//! Expiry is lazy: an entry older than its TTL is treated as absent and
//! removed when read. Every write also sweeps expired entries.

use crate::traits::CacheStore;
use crate::types::{CacheStats, Job, Result, SearchParams};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCacheEntry {
    /// Jobs in rank order, exactly as stored.
    pub jobs: Vec<Job>,
    pub sources: Vec<String>,
    pub last_updated: DateTime<Utc>,
    pub ttl_ms: u64,
}

impl JobCacheEntry {
    pub fn new(jobs: Vec<Job>, sources: Vec<String>, last_updated: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            jobs,
            sources,
            last_updated,
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age_ms = now.signed_duration_since(self.last_updated).num_milliseconds();
        age_ms > self.ttl_ms as i64
    }

    pub fn job_list(&self) -> Vec<Job> {
        self.jobs.clone()
    }

    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == job_id)
    }
}

/// Process-local [`CacheStore`].
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, JobCacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Option<JobCacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    async fn set(&self, key: String, entry: JobCacheEntry) {
        self.entries.write().await.insert(key, entry);
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    async fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn entries(&self) -> Vec<(String, JobCacheEntry)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }
}

pub struct JobCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl JobCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_store(Arc::new(InMemoryCacheStore::new()), ttl)
    }

    pub fn with_store(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stable key: the parameters serialized with object keys sorted and unset fields omitted.
    pub fn cache_key(params: &SearchParams) -> Result<String> {
        let value = serde_json::to_value(params)?;
        let sorted: BTreeMap<String, serde_json::Value> = match value {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Ok(serde_json::to_string(&sorted)?)
    }

    pub async fn get(&self, params: &SearchParams) -> Result<Option<JobCacheEntry>> {
        self.get_at(params, Utc::now()).await
    }

    pub async fn get_at(&self, params: &SearchParams, now: DateTime<Utc>) -> Result<Option<JobCacheEntry>> {
        let key = Self::cache_key(params)?;
        match self.store.get(&key).await {
            Some(entry) if entry.is_expired(now) => {
                debug!("Cache entry expired for {}", key);
                self.store.delete(&key).await;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry)),
            None => Ok(None),
        }
    }

    pub async fn store(&self, params: &SearchParams, jobs: Vec<Job>, sources: Vec<String>) -> Result<()> {
        self.store_at(params, jobs, sources, Utc::now()).await
    }

    pub async fn store_at(
        &self,
        params: &SearchParams,
        jobs: Vec<Job>,
        sources: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let key = Self::cache_key(params)?;
        let evicted = self.store.evict_expired(now).await;
        if evicted > 0 {
            debug!("Evicted {} expired cache entries", evicted);
        }

        debug!("Caching {} jobs under {}", jobs.len(), key);
        self.store.set(key, JobCacheEntry::new(jobs, sources, now, self.ttl)).await;
        Ok(())
    }

    /// Looks a job up across every live cache entry.
    pub async fn find_job(&self, job_id: &str) -> Option<Job> {
        let now = Utc::now();
        self.store
            .entries()
            .await
            .into_iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .find_map(|(_, entry)| entry.job(job_id).cloned())
    }

    pub async fn clear(&self) {
        self.store.clear().await;
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats_at(Utc::now()).await
    }

    pub async fn stats_at(&self, now: DateTime<Utc>) -> CacheStats {
        let entries = self.store.entries().await;
        let live: Vec<_> = entries.iter().filter(|(_, entry)| !entry.is_expired(now)).collect();
        CacheStats {
            entries: entries.len(),
            live_entries: live.len(),
            cached_jobs: live.iter().map(|(_, entry)| entry.jobs.len()).sum(),
            ttl_ms: self.ttl.as_millis() as u64,
        }
    }
}
