use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse seniority bucket shared by every source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    #[serde(rename = "Entry")]
    Entry,
    #[serde(rename = "Mid-level")]
    MidLevel,
    #[serde(rename = "Senior")]
    Senior,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "Entry",
            ExperienceLevel::MidLevel => "Mid-level",
            ExperienceLevel::Senior => "Senior",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entry" | "entry-level" | "junior" => Ok(ExperienceLevel::Entry),
            "mid" | "mid-level" | "midlevel" => Ok(ExperienceLevel::MidLevel),
            "senior" => Ok(ExperienceLevel::Senior),
            other => Err(format!("unknown experience level: {}", other)),
        }
    }
}

/// Static descriptor of where a job came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSource {
    pub name: String,
    /// Requests per hour.
    pub rate_limit: u32,
    pub priority: u8,
    pub enabled: bool,
}

impl JobSource {
    pub fn new(name: impl Into<String>, rate_limit: u32, priority: u8) -> Self {
        Self {
            name: name.into(),
            rate_limit,
            priority,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// The canonical job record every source is normalized into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(rename = "type")]
    pub job_type: String,
    pub experience: ExperienceLevel,
    #[serde(default)]
    pub tags: Vec<String>,
    pub date_posted: DateTime<Utc>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub source: JobSource,
    #[serde(rename = "isAIRecommended")]
    pub is_ai_recommended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub benefits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicants: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u32>,
}

impl Job {
    /// True when the job is flagged remote or its location mentions remote work.
    pub fn is_remote(&self) -> bool {
        self.remote.unwrap_or(false) || self.location.to_lowercase().contains("remote")
    }

    /// Content key used to collapse the same posting seen through different sources.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.title.to_lowercase(),
            self.company.to_lowercase(),
            self.location.to_lowercase()
        )
    }
}

/// Fixed salary buckets offered to searchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SalaryRange {
    #[serde(rename = "$50k - $80k")]
    From50kTo80k,
    #[serde(rename = "$80k - $120k")]
    From80kTo120k,
    #[serde(rename = "$120k - $180k")]
    From120kTo180k,
    #[serde(rename = "$180k+")]
    Above180k,
}

impl SalaryRange {
    pub const ALL: [SalaryRange; 4] = [
        SalaryRange::From50kTo80k,
        SalaryRange::From80kTo120k,
        SalaryRange::From120kTo180k,
        SalaryRange::Above180k,
    ];

    /// Inclusive bounds in whole dollars; `None` means unbounded above.
    pub fn bounds(&self) -> (u64, Option<u64>) {
        match self {
            SalaryRange::From50kTo80k => (50_000, Some(80_000)),
            SalaryRange::From80kTo120k => (80_000, Some(120_000)),
            SalaryRange::From120kTo180k => (120_000, Some(180_000)),
            SalaryRange::Above180k => (180_000, None),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SalaryRange::From50kTo80k => "$50k - $80k",
            SalaryRange::From80kTo120k => "$80k - $120k",
            SalaryRange::From120kTo180k => "$120k - $180k",
            SalaryRange::Above180k => "$180k+",
        }
    }
}

impl fmt::Display for SalaryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SalaryRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SalaryRange::ALL
            .into_iter()
            .find(|range| range.as_str() == wanted)
            .ok_or_else(|| format!("unknown salary range: {}", wanted))
    }
}

/// Search query. Doubles as the cache key once canonicalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<SalaryRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl SearchParams {
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }
}

/// Response of one aggregation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAggregationResult {
    pub jobs: Vec<Job>,
    pub total: usize,
    /// Names of the sources that contributed at least one job.
    pub sources: Vec<String>,
    pub cache_hit: bool,
    pub execution_time_ms: u64,
    /// Per-source failures that were tolerated while building this result.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Fields a user fills in when posting a job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default, rename = "type")]
    pub job_type: Option<String>,
    #[serde(default)]
    pub experience: Option<ExperienceLevel>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub remote: Option<bool>,
    #[serde(default)]
    pub equity: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub contact_email: String,
    #[serde(default)]
    pub submitted_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub live_entries: usize,
    pub cached_jobs: usize,
    pub ttl_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationStats {
    pub cache_stats: CacheStats,
    pub user_submitted_job_count: usize,
    pub verified_user_job_count: usize,
    pub enabled_source_count: usize,
    pub enabled_feed_count: usize,
    /// Requests left in the current rate-limit window, per API source.
    pub rate_limit_remaining: BTreeMap<String, u32>,
}

/// Inbound contract used by route handlers and other collaborators.
///
/// `aggregate_jobs` never fails: every source failure is folded into
/// [`JobAggregationResult::errors`].
#[async_trait]
pub trait JobBoard: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn aggregate_jobs(&self, params: &SearchParams) -> JobAggregationResult;

    async fn submit_job(&self, submission: JobSubmission) -> Result<String, Self::Error>;

    async fn verify_user_job(&self, job_id: &str) -> bool;

    async fn delete_user_job(&self, job_id: &str) -> bool;

    async fn get_job_by_id(&self, job_id: &str) -> Option<Job>;

    async fn get_stats(&self) -> AggregationStats;

    async fn clear_cache(&self);
}
