use crate::cache::JobCacheEntry;
use crate::types::{Job, JobSource, Result, SearchParams};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A job board API normalized into [`Job`] records.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Static descriptor (name, hourly budget, priority, enabled flag)
    fn source(&self) -> &JobSource;

    fn source_name(&self) -> &str {
        &self.source().name
    }

    /// Whether the credentials this source needs are present
    fn is_configured(&self) -> bool {
        true
    }

    /// Run one search against the upstream API.
    ///
    /// Fails fast with `NotConfigured` or `RateLimitExceeded` before any
    /// network traffic; upstream failures are returned, never retried.
    async fn search(&self, params: &SearchParams) -> Result<Vec<Job>>;
}

/// Key-value backing for the job cache.
///
/// The in-memory implementation is the default; a shared external cache can
/// be swapped in without touching the aggregation service.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<JobCacheEntry>;

    async fn set(&self, key: String, entry: JobCacheEntry);

    async fn delete(&self, key: &str) -> bool;

    /// Drops every entry expired at `now`, returning how many were removed
    async fn evict_expired(&self, now: DateTime<Utc>) -> usize;

    async fn clear(&self);

    async fn entries(&self) -> Vec<(String, JobCacheEntry)>;
}
