use super::SourceContext;
use crate::config::RssFeed;
use crate::parser::FeedParser;
use crate::types::{AggregatorError, Job, JobSource, ParsedEntry, Result};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Fetches one company feed and maps its items into jobs.
pub struct RssParser {
    source: JobSource,
    context: SourceContext,
    parser: FeedParser,
}

impl RssParser {
    pub fn new(source: JobSource, context: SourceContext) -> Self {
        Self {
            source,
            context,
            parser: FeedParser::new(),
        }
    }

    pub fn source(&self) -> &JobSource {
        &self.source
    }

    pub async fn parse_feed(&self, feed: &RssFeed) -> Result<Vec<Job>> {
        self.parse_feed_as(feed, &slug(&feed.name)).await
    }

    /// Like [`parse_feed`](Self::parse_feed), with ids prefixed by `slug`.
    async fn parse_feed_as(&self, feed: &RssFeed, slug: &str) -> Result<Vec<Job>> {
        info!("Pulling RSS feed: {} ({})", feed.name, feed.url);

        let fetch_result = self.context.fetcher.fetch_feed(&feed.url).await?;
        if !fetch_result.success {
            let error_msg = fetch_result.error.unwrap_or_else(|| "Fetch failed".to_string());
            return Err(AggregatorError::General(format!("{}: {}", feed.name, error_msg)));
        }

        let Some(content) = fetch_result.content else {
            warn!("No content returned for RSS feed {}", feed.url);
            return Ok(Vec::new());
        };

        let parsed = self.parser.parse_feed(&content)?;
        let jobs: Vec<Job> = parsed
            .entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| self.to_job(feed, slug, index, entry))
            .collect();

        debug!("Feed {} produced {} jobs", feed.name, jobs.len());
        Ok(jobs)
    }

    fn to_job(&self, feed: &RssFeed, slug: &str, index: usize, entry: ParsedEntry) -> Job {
        let enricher = &self.context.enricher;
        let category = entry.categories.join(" ");

        Job {
            id: format!("rss-{}-{}", slug, index),
            experience: enricher.experience(&entry.title, &category),
            tags: enricher.tags(&entry.description),
            is_ai_recommended: enricher.is_ai_recommended(&entry.title, &entry.description),
            company: feed.company.clone(),
            location: enricher.infer_location(&entry.description),
            salary: None,
            job_type: enricher.infer_job_type(&entry.description),
            date_posted: entry.published_at.unwrap_or_else(Utc::now),
            title: entry.title,
            description: entry.description,
            url: Some(entry.url),
            source: self.source.clone(),
            remote: None,
            equity: None,
            requirements: Vec::new(),
            benefits: Vec::new(),
            applicants: None,
            views: None,
        }
    }
}

/// Runs every enabled feed concurrently. A failing feed is logged and skipped.
pub struct RssAggregator {
    parser: RssParser,
    feeds: Vec<RssFeed>,
}

impl RssAggregator {
    pub fn new(parser: RssParser, feeds: Vec<RssFeed>) -> Self {
        Self { parser, feeds }
    }

    pub fn source(&self) -> &JobSource {
        self.parser.source()
    }

    pub fn feeds(&self) -> &[RssFeed] {
        &self.feeds
    }

    pub fn enabled_feed_count(&self) -> usize {
        self.feeds.iter().filter(|feed| feed.enabled).count()
    }

    pub async fn aggregate_jobs(&self) -> Vec<Job> {
        let enabled: Vec<&RssFeed> = self.feeds.iter().filter(|feed| feed.enabled).collect();
        let slugs = unique_slugs(&enabled);
        let results = join_all(
            enabled
                .iter()
                .zip(&slugs)
                .map(|(feed, slug)| self.parser.parse_feed_as(feed, slug)),
        )
        .await;

        let mut jobs = Vec::new();
        for (feed, result) in enabled.iter().zip(results) {
            match result {
                Ok(feed_jobs) => jobs.extend(feed_jobs),
                Err(e) => error!("RSS feed {} failed: {}", feed.name, e),
            }
        }

        info!("RSS aggregation produced {} jobs from {} feeds", jobs.len(), enabled.len());
        jobs
    }
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Feed slugs for one run. A repeated slug gets a `-2`, `-3`... suffix so job ids stay unique.
fn unique_slugs(feeds: &[&RssFeed]) -> Vec<String> {
    let mut used = HashSet::new();
    feeds
        .iter()
        .map(|feed| {
            let base = slug(&feed.name);
            let mut candidate = base.clone();
            let mut n = 2;
            while !used.insert(candidate.clone()) {
                candidate = format!("{}-{}", base, n);
                n += 1;
            }
            candidate
        })
        .collect()
}
