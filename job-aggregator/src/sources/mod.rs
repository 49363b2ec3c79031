pub mod adzuna;
pub mod github;
pub mod rss;
pub mod usajobs;

pub use adzuna::AdzunaClient;
pub use github::GitHubJobsClient;
pub use rss::{RssAggregator, RssParser};
pub use usajobs::UsaJobsClient;

use crate::enrichment::{Enricher, KeywordEnricher};
use crate::fetcher::Fetcher;
use crate::rate_limiter::RateLimiter;
use crate::types::{AggregatorError, FetchConfig, JobSource, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Collaborators every source shares: the HTTP client, the rate limiter and
/// the enrichment heuristics.
#[derive(Clone)]
pub struct SourceContext {
    pub fetcher: Arc<Fetcher>,
    pub rate_limiter: Arc<RateLimiter>,
    pub enricher: Arc<dyn Enricher>,
}

impl SourceContext {
    pub fn new(fetcher: Arc<Fetcher>, rate_limiter: Arc<RateLimiter>, enricher: Arc<dyn Enricher>) -> Self {
        Self {
            fetcher,
            rate_limiter,
            enricher,
        }
    }

    /// Fresh fetcher, limiter and default keyword enricher.
    pub fn with_defaults(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(Fetcher::new(fetch_config)?),
            Arc::new(RateLimiter::new()),
            Arc::new(KeywordEnricher::default()),
        ))
    }

    pub(crate) fn check_rate_limit(&self, source: &JobSource) -> Result<()> {
        if self.rate_limiter.allow(&source.name, source.rate_limit) {
            Ok(())
        } else {
            Err(AggregatorError::RateLimitExceeded {
                source_name: source.name.clone(),
            })
        }
    }
}

/// Maps the many spellings upstream APIs use onto our employment types.
pub(crate) fn normalize_job_type(raw: &str) -> String {
    let raw = raw.to_lowercase();
    if raw.contains("part") {
        "Part-time".to_string()
    } else if raw.contains("contract") || raw.contains("temporary") || raw.contains("freelance") {
        "Contract".to_string()
    } else if raw.contains("intern") {
        "Internship".to_string()
    } else {
        "Full-time".to_string()
    }
}

/// Accepts RFC 3339, RFC 2822, zone-less ISO timestamps and the
/// `Mon Jan 06 10:00:00 UTC 2025` style used by GitHub Jobs.
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%a %b %d %H:%M:%S UTC %Y"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    debug!("Unrecognized date format: {}", raw);
    None
}

/// Upstream ids arrive as numbers or strings.
pub(crate) fn id_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => uuid::Uuid::new_v4().simple().to_string(),
        other => other.to_string(),
    }
}
