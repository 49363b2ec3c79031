use crate::cache::JobCache;
use crate::config::{AggregatorConfig, SEED_SOURCE};
use crate::enrichment::{Enricher, KeywordEnricher};
use crate::fetcher::Fetcher;
use crate::processing::{default_stages, ProcessingStage};
use crate::rate_limiter::RateLimiter;
use crate::seed::seed_jobs;
use crate::sources::{AdzunaClient, GitHubJobsClient, RssAggregator, RssParser, SourceContext, UsaJobsClient};
use crate::submissions::UserSubmissionStore;
use crate::traits::SourceClient;
use crate::types::{
    AggregationStats, AggregatorError, Job, JobAggregationResult, JobBoard, JobSubmission, Result,
    SearchParams,
};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Where a single `aggregate_jobs` call currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationStage {
    CacheCheck,
    Fetching,
    Merging,
    /// Dedupe, rank and filter, as configured by the processing stages.
    Processing,
    CacheStore,
    Done,
}

impl fmt::Display for AggregationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationStage::CacheCheck => "cache-check",
            AggregationStage::Fetching => "fetching",
            AggregationStage::Merging => "merging",
            AggregationStage::Processing => "processing",
            AggregationStage::CacheStore => "cache-store",
            AggregationStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Fans a search out to every source, merges the answers and caches the ranked result.
pub struct AggregationService {
    config: AggregatorConfig,
    clients: Vec<Arc<dyn SourceClient>>,
    rss: RssAggregator,
    submissions: Arc<UserSubmissionStore>,
    cache: JobCache,
    rate_limiter: Arc<RateLimiter>,
    stages: Vec<Box<dyn ProcessingStage>>,
}

impl AggregationService {
    pub fn builder(config: AggregatorConfig) -> AggregationServiceBuilder {
        AggregationServiceBuilder::new(config)
    }

    /// Service wired with the real Adzuna, USAJobs, GitHub Jobs and RSS sources.
    pub fn from_config(config: AggregatorConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn rss(&self) -> &RssAggregator {
        &self.rss
    }

    pub fn submissions(&self) -> &UserSubmissionStore {
        &self.submissions
    }

    fn enter(&self, stage: AggregationStage) {
        debug!("Aggregation stage: {}", stage);
    }

    /// Runs every enabled API client and the RSS pass concurrently.
    /// Failures come back as strings; nothing here can abort the request.
    async fn fetch_all(&self, params: &SearchParams) -> (Vec<Job>, Vec<String>) {
        let mut errors = Vec::new();
        let mut active = Vec::new();

        for client in &self.clients {
            let name = client.source_name();
            if !client.source().enabled {
                debug!("Skipping disabled source {}", name);
            } else if !client.is_configured() {
                // Recorded without calling the client so the limiter is untouched.
                let e = AggregatorError::NotConfigured {
                    source_name: name.to_string(),
                    missing: "credentials",
                };
                warn!("{}", e);
                errors.push(e.to_string());
            } else {
                active.push(client.clone());
            }
        }

        let api_calls = join_all(active.iter().map(|client| async move {
            let outcome = client.search(params).await;
            (client.source_name().to_string(), outcome)
        }));
        let rss_call = async {
            if self.rss.source().enabled {
                self.rss.aggregate_jobs().await
            } else {
                Vec::new()
            }
        };

        let (api_results, rss_jobs) = tokio::join!(api_calls, rss_call);

        let mut jobs = Vec::new();
        for (name, outcome) in api_results {
            match outcome {
                Ok(source_jobs) => {
                    info!("{} contributed {} jobs", name, source_jobs.len());
                    jobs.extend(source_jobs);
                }
                Err(e) => {
                    error!("{} failed: {}", name, e);
                    errors.push(e.to_string());
                }
            }
        }
        jobs.extend(rss_jobs);

        (jobs, errors)
    }

    /// Names of the sources that contributed at least one job, in first-seen order.
    fn contributing_sources(jobs: &[Job]) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        for job in jobs {
            if !sources.iter().any(|name| name == &job.source.name) {
                sources.push(job.source.name.clone());
            }
        }
        sources
    }

    fn rate_limit_remaining(&self) -> BTreeMap<String, u32> {
        self.clients
            .iter()
            .filter(|client| client.source().enabled)
            .map(|client| {
                let source = client.source();
                (
                    source.name.clone(),
                    self.rate_limiter.remaining(&source.name, source.rate_limit),
                )
            })
            .collect()
    }
}

#[async_trait]
impl JobBoard for AggregationService {
    type Error = AggregatorError;

    async fn aggregate_jobs(&self, params: &SearchParams) -> JobAggregationResult {
        let start_time = Instant::now();
        let mut errors = Vec::new();

        self.enter(AggregationStage::CacheCheck);
        match self.cache.get(params).await {
            Ok(Some(entry)) => {
                let jobs = entry.job_list();
                info!("Cache hit: {} jobs", jobs.len());
                self.enter(AggregationStage::Done);
                return JobAggregationResult {
                    total: jobs.len(),
                    jobs,
                    sources: entry.sources,
                    cache_hit: true,
                    execution_time_ms: start_time.elapsed().as_millis() as u64,
                    errors,
                };
            }
            Ok(None) => debug!("Cache miss"),
            Err(e) => {
                warn!("Cache lookup failed: {}", e);
                errors.push(e.to_string());
            }
        }

        self.enter(AggregationStage::Fetching);
        let (mut jobs, fetch_errors) = self.fetch_all(params).await;
        errors.extend(fetch_errors);

        self.enter(AggregationStage::Merging);
        jobs.extend(self.submissions.list_verified_as_jobs(params).await);
        if self.config.development_mode {
            debug!("Development mode: mixing in {} jobs", SEED_SOURCE);
            jobs.extend(seed_jobs());
        }
        debug!("Merged {} jobs", jobs.len());

        self.enter(AggregationStage::Processing);
        for stage in &self.stages {
            let before = jobs.len();
            jobs = stage.process(jobs, params);
            debug!("Stage {} kept {}/{} jobs", stage.stage_name(), jobs.len(), before);
        }

        let sources = Self::contributing_sources(&jobs);

        self.enter(AggregationStage::CacheStore);
        if let Err(e) = self.cache.store(params, jobs.clone(), sources.clone()).await {
            warn!("Failed to cache aggregation result: {}", e);
            errors.push(e.to_string());
        }

        self.enter(AggregationStage::Done);
        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Aggregated {} jobs from {} sources in {}ms ({} errors)",
            jobs.len(),
            sources.len(),
            execution_time_ms,
            errors.len()
        );

        JobAggregationResult {
            total: jobs.len(),
            jobs,
            sources,
            cache_hit: false,
            execution_time_ms,
            errors,
        }
    }

    async fn submit_job(&self, submission: JobSubmission) -> Result<String> {
        self.submissions.submit(submission).await
    }

    async fn verify_user_job(&self, job_id: &str) -> bool {
        self.submissions.verify(job_id).await
    }

    async fn delete_user_job(&self, job_id: &str) -> bool {
        self.submissions.delete(job_id).await
    }

    async fn get_job_by_id(&self, job_id: &str) -> Option<Job> {
        if let Some(job) = self.cache.find_job(job_id).await {
            return Some(job);
        }
        self.submissions.verified_job(job_id).await
    }

    async fn get_stats(&self) -> AggregationStats {
        let enabled_source_count = self.clients.iter().filter(|c| c.source().enabled).count()
            + usize::from(self.rss.source().enabled);

        AggregationStats {
            cache_stats: self.cache.stats().await,
            user_submitted_job_count: self.submissions.count().await,
            verified_user_job_count: self.submissions.verified_count().await,
            enabled_source_count,
            enabled_feed_count: self.rss.enabled_feed_count(),
            rate_limit_remaining: self.rate_limit_remaining(),
        }
    }

    async fn clear_cache(&self) {
        info!("Clearing job cache");
        self.cache.clear().await;
    }
}

/// Explicit wiring for [`AggregationService`]. Anything not supplied is
/// built from the config.
pub struct AggregationServiceBuilder {
    config: AggregatorConfig,
    fetcher: Option<Arc<Fetcher>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    enricher: Option<Arc<dyn Enricher>>,
    clients: Option<Vec<Arc<dyn SourceClient>>>,
    submissions: Option<Arc<UserSubmissionStore>>,
    cache: Option<JobCache>,
    stages: Option<Vec<Box<dyn ProcessingStage>>>,
}

impl AggregationServiceBuilder {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            fetcher: None,
            rate_limiter: None,
            enricher: None,
            clients: None,
            submissions: None,
            cache: None,
            stages: None,
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Replaces the built-in API clients.
    pub fn clients(mut self, clients: Vec<Arc<dyn SourceClient>>) -> Self {
        self.clients = Some(clients);
        self
    }

    pub fn submissions(mut self, submissions: Arc<UserSubmissionStore>) -> Self {
        self.submissions = Some(submissions);
        self
    }

    pub fn cache(mut self, cache: JobCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn stages(mut self, stages: Vec<Box<dyn ProcessingStage>>) -> Self {
        self.stages = Some(stages);
        self
    }

    pub fn build(self) -> Result<AggregationService> {
        let config = self.config;
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(Fetcher::new(config.fetch.clone())?),
        };
        let rate_limiter = self.rate_limiter.unwrap_or_default();
        let enricher = self
            .enricher
            .unwrap_or_else(|| Arc::new(KeywordEnricher::default()));
        let context = SourceContext::new(fetcher, rate_limiter.clone(), enricher.clone());

        let clients = self
            .clients
            .unwrap_or_else(|| default_clients(&config, &context));
        let rss = RssAggregator::new(
            RssParser::new(config.rss.clone(), context),
            config.feeds.clone(),
        );
        let submissions = self
            .submissions
            .unwrap_or_else(|| Arc::new(UserSubmissionStore::new(enricher)));
        let cache = self.cache.unwrap_or_else(|| JobCache::new(config.cache_ttl));
        let stages = self.stages.unwrap_or_else(default_stages);

        info!(
            "Aggregation service ready: {} API sources, {} feeds, development_mode={}",
            clients.len(),
            rss.enabled_feed_count(),
            config.development_mode
        );

        Ok(AggregationService {
            config,
            clients,
            rss,
            submissions,
            cache,
            rate_limiter,
            stages,
        })
    }
}

fn default_clients(config: &AggregatorConfig, context: &SourceContext) -> Vec<Arc<dyn SourceClient>> {
    let credentials = &config.credentials;
    let endpoints = &config.endpoints;
    vec![
        Arc::new(AdzunaClient::new(
            config.adzuna.clone(),
            context.clone(),
            endpoints.adzuna_base_url.clone(),
            endpoints.adzuna_country.clone(),
            credentials.adzuna_app_id.clone(),
            credentials.adzuna_app_key.clone(),
        )),
        Arc::new(UsaJobsClient::new(
            config.usajobs.clone(),
            context.clone(),
            endpoints.usajobs_base_url.clone(),
            credentials.usajobs_api_key.clone(),
            credentials.usajobs_user_agent.clone(),
        )),
        Arc::new(GitHubJobsClient::new(
            config.github_jobs.clone(),
            context.clone(),
            endpoints.github_jobs_base_url.clone(),
        )),
    ]
}
