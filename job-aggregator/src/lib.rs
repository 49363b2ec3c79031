pub mod types;
pub mod config;
pub mod rate_limiter;
pub mod enrichment;
pub mod fetcher;
pub mod parser;
pub mod traits;
pub mod sources;
pub mod processing;
pub mod cache;
pub mod submissions;
pub mod seed;
pub mod aggregator;

pub use types::*;
pub use config::{AggregatorConfig, RssFeed, SourceCredentials, SourceEndpoints};
pub use rate_limiter::RateLimiter;
pub use enrichment::{Enricher, KeywordEnricher};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use traits::{CacheStore, SourceClient};
pub use sources::{AdzunaClient, GitHubJobsClient, RssAggregator, RssParser, SourceContext, UsaJobsClient};
pub use processing::{default_stages, ProcessingStage};
pub use cache::{InMemoryCacheStore, JobCache, JobCacheEntry};
pub use submissions::UserSubmissionStore;
pub use aggregator::{AggregationService, AggregationServiceBuilder, AggregationStage};
