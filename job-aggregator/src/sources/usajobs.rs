use super::{id_string, normalize_job_type, parse_date, SourceContext, DEFAULT_PAGE_SIZE};
use crate::enrichment::format_salary;
use crate::traits::SourceClient;
use crate::types::{AggregatorError, Job, JobSource, Result, SearchParams};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use url::Url;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UsaJobsResponse {
    search_result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResult {
    #[serde(default)]
    search_result_items: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResultItem {
    #[serde(default)]
    matched_object_id: serde_json::Value,
    matched_object_descriptor: PositionDescriptor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PositionDescriptor {
    #[serde(default)]
    position_title: String,
    organization_name: Option<String>,
    department_name: Option<String>,
    position_location_display: Option<String>,
    #[serde(default)]
    position_remuneration: Vec<Remuneration>,
    #[serde(default)]
    position_schedule: Vec<NamedCode>,
    #[serde(default)]
    job_category: Vec<NamedCode>,
    publication_start_date: Option<String>,
    #[serde(rename = "PositionURI")]
    position_uri: Option<String>,
    qualification_summary: Option<String>,
    user_area: Option<UserArea>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Remuneration {
    minimum_range: Option<String>,
    maximum_range: Option<String>,
    rate_interval_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NamedCode {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserArea {
    details: Option<Details>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Details {
    job_summary: Option<String>,
    remote_indicator: Option<bool>,
    #[serde(default)]
    major_duties: Vec<String>,
}

/// USAJobs search API. Needs an API key; callers identify with a contact email.
pub struct UsaJobsClient {
    source: JobSource,
    context: SourceContext,
    base_url: String,
    api_key: Option<String>,
    user_agent: Option<String>,
}

impl UsaJobsClient {
    pub fn new(
        source: JobSource,
        context: SourceContext,
        base_url: impl Into<String>,
        api_key: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            source,
            context,
            base_url: base_url.into(),
            api_key,
            user_agent,
        }
    }

    fn build_url(&self, params: &SearchParams) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair(
                    "ResultsPerPage",
                    &params.limit.unwrap_or(DEFAULT_PAGE_SIZE).to_string(),
                )
                .append_pair("Page", &params.page.unwrap_or(1).max(1).to_string());

            if let Some(keyword) = params.query.as_deref().filter(|q| !q.trim().is_empty()) {
                query.append_pair("Keyword", keyword);
            }
            if let Some(location) = params.location.as_deref().filter(|l| !l.trim().is_empty()) {
                query.append_pair("LocationName", location);
            }
            if let Some(radius) = params.radius {
                query.append_pair("Radius", &radius.to_string());
            }
            if params.remote == Some(true) {
                query.append_pair("RemoteIndicator", "True");
            }
        }
        Ok(url)
    }

    fn to_job(&self, item: SearchResultItem) -> Job {
        let enricher = &self.context.enricher;
        let position = item.matched_object_descriptor;

        let details = position.user_area.and_then(|area| area.details);
        let remote = details.as_ref().and_then(|d| d.remote_indicator);
        let requirements = details
            .as_ref()
            .map(|d| d.major_duties.clone())
            .unwrap_or_default();
        let description = details
            .and_then(|d| d.job_summary)
            .or(position.qualification_summary)
            .unwrap_or_default();

        let category = position
            .job_category
            .first()
            .and_then(|c| c.name.clone())
            .unwrap_or_default();
        let job_type = position
            .position_schedule
            .first()
            .and_then(|s| s.name.as_deref())
            .map(normalize_job_type)
            .unwrap_or_else(|| normalize_job_type(""));
        let salary = position.position_remuneration.first().and_then(|pay| {
            let min = pay.minimum_range.as_deref().and_then(|v| v.parse::<f64>().ok());
            let max = pay.maximum_range.as_deref().and_then(|v| v.parse::<f64>().ok());
            match pay.rate_interval_code.as_deref() {
                Some("PA") | None => format_salary(min, max),
                Some(interval) => match (min, max) {
                    (Some(min), Some(max)) => Some(format!("${:.2} - ${:.2} ({})", min, max, interval)),
                    _ => None,
                },
            }
        });

        Job {
            id: format!("usajobs-{}", id_string(&item.matched_object_id)),
            experience: enricher.experience(&position.position_title, &category),
            tags: enricher.tags(&description),
            is_ai_recommended: enricher.is_ai_recommended(&position.position_title, &description),
            company: position
                .organization_name
                .or(position.department_name)
                .unwrap_or_else(|| "U.S. Federal Government".to_string()),
            location: position
                .position_location_display
                .unwrap_or_else(|| "Multiple Locations".to_string()),
            salary,
            job_type,
            date_posted: position
                .publication_start_date
                .as_deref()
                .and_then(parse_date)
                .unwrap_or_else(Utc::now),
            title: position.position_title,
            description,
            url: position.position_uri,
            source: self.source.clone(),
            remote,
            equity: None,
            requirements,
            benefits: Vec::new(),
            applicants: None,
            views: None,
        }
    }
}

#[async_trait]
impl SourceClient for UsaJobsClient {
    fn source(&self) -> &JobSource {
        &self.source
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<Job>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AggregatorError::NotConfigured {
                source_name: self.source.name.clone(),
                missing: "USAJOBS_API_KEY",
            });
        };
        self.context.check_rate_limit(&self.source)?;

        let url = self.build_url(params)?;
        let fetcher = &self.context.fetcher;
        let user_agent = self
            .user_agent
            .as_deref()
            .unwrap_or(&fetcher.config().user_agent);
        let request = fetcher
            .get(url)
            .header("Authorization-Key", api_key)
            .header(reqwest::header::USER_AGENT, user_agent);

        let response: UsaJobsResponse = fetcher.send_json(&self.source.name, request).await?;
        let items = response
            .search_result
            .map(|result| result.search_result_items)
            .unwrap_or_default();

        let jobs: Vec<Job> = items.into_iter().map(|item| self.to_job(item)).collect();
        info!("USAJobs returned {} jobs", jobs.len());
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExperienceLevel, FetchConfig};
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, api_key: Option<&str>) -> UsaJobsClient {
        let context = SourceContext::with_defaults(FetchConfig::default()).unwrap();
        UsaJobsClient::new(
            JobSource::new("USAJobs", 10, 2),
            context,
            base_url,
            api_key.map(str::to_string),
            Some("jobs@example.org".to_string()),
        )
    }

    #[tokio::test]
    async fn maps_search_result_items() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "SearchResult": {
                "SearchResultItems": [{
                    "MatchedObjectId": "778899",
                    "MatchedObjectDescriptor": {
                        "PositionTitle": "IT Specialist (Entry)",
                        "OrganizationName": "Department of Energy",
                        "PositionLocationDisplay": "Washington, DC",
                        "PositionRemuneration": [{
                            "MinimumRange": "58000.0",
                            "MaximumRange": "75000.0",
                            "RateIntervalCode": "PA"
                        }],
                        "PositionSchedule": [{"Name": "Full-Time"}],
                        "JobCategory": [{"Name": "Information Technology Management"}],
                        "PublicationStartDate": "2025-01-06T00:00:00.0000",
                        "PositionURI": "https://www.usajobs.gov/job/778899",
                        "UserArea": {"Details": {
                            "JobSummary": "Manage SQL databases on Linux servers.",
                            "RemoteIndicator": false
                        }}
                    }
                }]
            }
        });
        Mock::given(method("GET"))
            .and(header("Authorization-Key", "secret"))
            .and(header("user-agent", "jobs@example.org"))
            .and(query_param("Keyword", "it"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let jobs = client(&server.uri(), Some("secret"))
            .search(&SearchParams::with_query("it"))
            .await
            .unwrap();

        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.id, "usajobs-778899");
        assert_eq!(job.company, "Department of Energy");
        assert_eq!(job.salary.as_deref(), Some("$58k - $75k"));
        assert_eq!(job.job_type, "Full-time");
        assert_eq!(job.experience, ExperienceLevel::Entry);
        assert_eq!(job.remote, Some(false));
        assert_eq!(job.tags, vec!["SQL".to_string()]);
    }

    #[tokio::test]
    async fn empty_search_result_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let jobs = client(&server.uri(), Some("secret"))
            .search(&SearchParams::default())
            .await
            .unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn missing_api_key_short_circuits() {
        let client = client("http://127.0.0.1:9/api/search", None);
        assert!(!client.is_configured());
        let result = client.search(&SearchParams::default()).await;
        assert!(matches!(result, Err(AggregatorError::NotConfigured { .. })));
    }
}
