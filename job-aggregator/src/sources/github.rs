use super::{id_string, normalize_job_type, parse_date, SourceContext};
use crate::enrichment::strip_html;
use crate::traits::SourceClient;
use crate::types::{Job, JobSource, Result, SearchParams};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use url::Url;

#[derive(Debug, Deserialize)]
struct GitHubPosition {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(rename = "type")]
    job_type: Option<String>,
    url: Option<String>,
    created_at: Option<String>,
    company: Option<String>,
    location: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

/// GitHub Jobs positions API. Public, no credentials.
pub struct GitHubJobsClient {
    source: JobSource,
    context: SourceContext,
    base_url: String,
}

impl GitHubJobsClient {
    pub fn new(source: JobSource, context: SourceContext, base_url: impl Into<String>) -> Self {
        Self {
            source,
            context,
            base_url: base_url.into(),
        }
    }

    fn build_url(&self, params: &SearchParams) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(description) = params.query.as_deref().filter(|q| !q.trim().is_empty()) {
                query.append_pair("description", description);
            }
            if let Some(location) = params.location.as_deref().filter(|l| !l.trim().is_empty()) {
                query.append_pair("location", location);
            }
            if params.job_type.as_deref() == Some("Full-time") {
                query.append_pair("full_time", "true");
            }
            // The API pages from zero.
            let page = params.page.unwrap_or(1).max(1) - 1;
            query.append_pair("page", &page.to_string());
        }
        Ok(url)
    }

    fn to_job(&self, raw: GitHubPosition) -> Job {
        let enricher = &self.context.enricher;
        let description = strip_html(&raw.description);
        let location = raw.location.unwrap_or_else(|| "Not specified".to_string());
        let remote = location.to_lowercase().contains("remote");

        Job {
            id: format!("github-{}", id_string(&raw.id)),
            experience: enricher.experience(&raw.title, ""),
            tags: enricher.tags(&description),
            is_ai_recommended: enricher.is_ai_recommended(&raw.title, &description),
            company: raw.company.unwrap_or_else(|| "Unknown Company".to_string()),
            location,
            salary: None,
            job_type: normalize_job_type(raw.job_type.as_deref().unwrap_or_default()),
            date_posted: raw
                .created_at
                .as_deref()
                .and_then(parse_date)
                .unwrap_or_else(Utc::now),
            title: raw.title,
            description,
            url: raw.url,
            source: self.source.clone(),
            remote: Some(remote),
            equity: None,
            requirements: Vec::new(),
            benefits: Vec::new(),
            applicants: None,
            views: None,
        }
    }
}

#[async_trait]
impl SourceClient for GitHubJobsClient {
    fn source(&self) -> &JobSource {
        &self.source
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<Job>> {
        self.context.check_rate_limit(&self.source)?;

        let url = self.build_url(params)?;
        let fetcher = &self.context.fetcher;
        let positions: Vec<GitHubPosition> = fetcher.send_json(&self.source.name, fetcher.get(url)).await?;

        let jobs: Vec<Job> = positions.into_iter().map(|raw| self.to_job(raw)).collect();
        info!("GitHub Jobs returned {} jobs", jobs.len());
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AggregatorError, ExperienceLevel, FetchConfig};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: String) -> GitHubJobsClient {
        let context = SourceContext::with_defaults(FetchConfig::default()).unwrap();
        GitHubJobsClient::new(JobSource::new("GitHub Jobs", 60, 3), context, base_url)
    }

    #[tokio::test]
    async fn maps_positions_and_strips_html() {
        let server = MockServer::start().await;
        let body = serde_json::json!([{
            "id": "b7e1-44",
            "type": "Full Time",
            "url": "https://jobs.github.com/positions/b7e1-44",
            "created_at": "Mon Jan 06 10:00:00 UTC 2025",
            "company": "Octo",
            "location": "Remote",
            "title": "Lead Platform Engineer",
            "description": "<p>Run <strong>Kubernetes</strong> clusters.</p>"
        }]);
        Mock::given(method("GET"))
            .and(path("/positions.json"))
            .and(query_param("description", "platform"))
            .and(query_param("page", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let jobs = client(format!("{}/positions.json", server.uri()))
            .search(&SearchParams::with_query("platform"))
            .await
            .unwrap();

        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.id, "github-b7e1-44");
        assert_eq!(job.description, "Run Kubernetes clusters.");
        assert_eq!(job.tags, vec!["Kubernetes".to_string()]);
        assert_eq!(job.experience, ExperienceLevel::Senior);
        assert_eq!(job.remote, Some(true));
        assert!(job.salary.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client(format!("{}/positions.json", server.uri()))
            .search(&SearchParams::default())
            .await;
        assert!(matches!(result, Err(AggregatorError::HttpStatus { status: 404, .. })));
    }
}
