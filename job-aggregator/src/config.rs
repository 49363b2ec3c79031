use crate::types::{FetchConfig, JobSource};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

pub const ADZUNA_SOURCE: &str = "Adzuna";
pub const USAJOBS_SOURCE: &str = "USAJobs";
pub const GITHUB_JOBS_SOURCE: &str = "GitHub Jobs";
pub const RSS_SOURCE: &str = "Company RSS Feeds";
pub const USER_SUBMISSIONS_SOURCE: &str = "User Submissions";
pub const SEED_SOURCE: &str = "Seed Data";

/// Thirty minutes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// A company careers feed polled by the RSS aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssFeed {
    pub name: String,
    pub url: String,
    pub company: String,
    pub enabled: bool,
}

impl RssFeed {
    pub fn new(name: impl Into<String>, url: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            company: company.into(),
            enabled: true,
        }
    }
}

pub fn default_feeds() -> Vec<RssFeed> {
    vec![
        RssFeed::new("Stack Overflow Jobs", "https://stackoverflow.com/jobs/feed", "Stack Overflow"),
        RssFeed::new("GitHub Careers", "https://github.com/about/careers.rss", "GitHub"),
        RssFeed::new("Automattic Careers", "https://automattic.com/work-with-us/feed/", "Automattic"),
        RssFeed::new("Mozilla Careers", "https://www.mozilla.org/en-US/careers/feed/", "Mozilla"),
        RssFeed::new("We Work Remotely", "https://weworkremotely.com/categories/remote-programming-jobs.rss", "We Work Remotely"),
    ]
}

/// API credentials. Each is optional; a missing credential disables only its source.
#[derive(Debug, Clone, Default)]
pub struct SourceCredentials {
    pub adzuna_app_id: Option<String>,
    pub adzuna_app_key: Option<String>,
    pub usajobs_api_key: Option<String>,
    /// USAJobs asks callers to identify themselves with a contact email.
    pub usajobs_user_agent: Option<String>,
}

impl SourceCredentials {
    pub fn from_env() -> Self {
        Self {
            adzuna_app_id: non_empty_var("ADZUNA_APP_ID"),
            adzuna_app_key: non_empty_var("ADZUNA_APP_KEY"),
            usajobs_api_key: non_empty_var("USAJOBS_API_KEY"),
            usajobs_user_agent: non_empty_var("USAJOBS_USER_AGENT"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceEndpoints {
    pub adzuna_base_url: String,
    pub adzuna_country: String,
    pub usajobs_base_url: String,
    pub github_jobs_base_url: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            adzuna_base_url: "https://api.adzuna.com/v1/api/jobs".to_string(),
            adzuna_country: "us".to_string(),
            usajobs_base_url: "https://data.usajobs.gov/api/search".to_string(),
            github_jobs_base_url: "https://jobs.github.com/positions.json".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub cache_ttl: Duration,
    /// Mixes the seed job set into every result.
    pub development_mode: bool,
    pub feeds: Vec<RssFeed>,
    pub credentials: SourceCredentials,
    pub endpoints: SourceEndpoints,
    pub fetch: FetchConfig,
    pub adzuna: JobSource,
    pub usajobs: JobSource,
    pub github_jobs: JobSource,
    pub rss: JobSource,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            development_mode: false,
            feeds: default_feeds(),
            credentials: SourceCredentials::default(),
            endpoints: SourceEndpoints::default(),
            fetch: FetchConfig::default(),
            adzuna: JobSource::new(ADZUNA_SOURCE, 1000, 1),
            usajobs: JobSource::new(USAJOBS_SOURCE, 200, 2),
            github_jobs: JobSource::new(GITHUB_JOBS_SOURCE, 60, 3),
            rss: JobSource::new(RSS_SOURCE, u32::MAX, 4),
        }
    }
}

impl AggregatorConfig {
    /// Reads credentials and tuning knobs from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self {
            credentials: SourceCredentials::from_env(),
            ..Self::default()
        };

        if let Some(raw) = non_empty_var("JOB_CACHE_TTL_SECONDS") {
            match raw.parse::<u64>() {
                Ok(seconds) => config.cache_ttl = Duration::from_secs(seconds),
                Err(e) => warn!("Ignoring JOB_CACHE_TTL_SECONDS={}: {}", raw, e),
            }
        }

        if let Some(raw) = non_empty_var("JOB_AGGREGATOR_DEV_MODE") {
            config.development_mode = matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        info!(
            "Loaded aggregator config: cache_ttl={}s, development_mode={}, feeds={}",
            config.cache_ttl.as_secs(),
            config.development_mode,
            config.feeds.len()
        );
        config
    }

    pub fn enabled_feeds(&self) -> impl Iterator<Item = &RssFeed> {
        self.feeds.iter().filter(|feed| feed.enabled)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
