use crate::types::{AggregatorError, FetchConfig, FetchResult, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// Shared HTTP client for API sources and RSS feeds.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Starts a GET request. The configured user agent is always attached.
    pub fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }

    /// Sends a request once and decodes a JSON body, mapping non-2xx statuses to
    /// [`AggregatorError::HttpStatus`].
    pub async fn send_json<T: DeserializeOwned>(&self, source_name: &str, request: RequestBuilder) -> Result<T> {
        let start_time = Instant::now();
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!("{} responded with HTTP {}", source_name, status);
            return Err(AggregatorError::HttpStatus {
                source_name: source_name.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(
            "{} responded in {}ms ({} bytes)",
            source_name,
            start_time.elapsed().as_millis(),
            body.len()
        );
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn fetch_feed(&self, url: &str) -> Result<FetchResult> {
        let start_time = Instant::now();
        let fetch_time = Utc::now();
        let parsed_url = Url::parse(url)?;

        debug!("Fetching feed: {}", url);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error = None;
        let mut last_status = None;

        for attempt in 0..=self.config.max_retries {
            match self.send(parsed_url.clone()).await {
                Ok(response) => {
                    let response_time = start_time.elapsed().as_millis() as u64;
                    let status = response.status();
                    last_status = Some(status.as_u16());

                    if !status.is_success() {
                        last_error = Some(AggregatorError::General(format!(
                            "HTTP {}: {}",
                            status,
                            status.canonical_reason().unwrap_or("Unknown")
                        )));

                        if attempt < self.config.max_retries {
                            if let Some(delay) = backoff.next_backoff() {
                                warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                                tokio::time::sleep(delay).await;
                                continue;
                            }
                        }
                        break;
                    }

                    if let Some(content_length) = response.content_length() {
                        let size_mb = content_length as usize / (1024 * 1024);
                        if size_mb > self.config.max_feed_size_mb {
                            return Ok(FetchResult {
                                url: url.to_string(),
                                success: false,
                                error: Some(AggregatorError::FeedTooLarge { size_mb }.to_string()),
                                fetch_time,
                                response_time_ms: response_time,
                                http_status: Some(status.as_u16()),
                                content: None,
                            });
                        }
                    }

                    match response.text().await {
                        Ok(content) => {
                            info!("Successfully fetched feed: {} ({} bytes)", url, content.len());
                            return Ok(FetchResult {
                                url: url.to_string(),
                                success: true,
                                error: None,
                                fetch_time,
                                response_time_ms: response_time,
                                http_status: Some(status.as_u16()),
                                content: Some(content),
                            });
                        }
                        Err(e) => {
                            last_error = Some(AggregatorError::Http(e));
                        }
                    }
                }
                Err(e) => {
                    last_error = Some(e);

                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                }
            }
        }

        let error_msg = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        error!("Failed to fetch feed after {} attempts: {}", self.config.max_retries + 1, url);

        Ok(FetchResult {
            url: url.to_string(),
            success: false,
            error: Some(error_msg),
            fetch_time,
            response_time_ms: start_time.elapsed().as_millis() as u64,
            http_status: last_status,
            content: None,
        })
    }

    async fn send(&self, url: Url) -> Result<Response> {
        let response = self.client.get(url).send().await?;
        Ok(response)
    }
}
