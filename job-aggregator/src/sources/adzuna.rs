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
struct AdzunaResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Deserialize)]
struct AdzunaLabel {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdzunaCategory {
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    title: String,
    company: Option<AdzunaLabel>,
    location: Option<AdzunaLabel>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    contract_time: Option<String>,
    contract_type: Option<String>,
    category: Option<AdzunaCategory>,
    created: Option<String>,
    #[serde(default)]
    description: String,
    redirect_url: Option<String>,
}

/// Adzuna search API. Needs an app id and app key.
pub struct AdzunaClient {
    source: JobSource,
    context: SourceContext,
    base_url: String,
    country: String,
    app_id: Option<String>,
    app_key: Option<String>,
}

impl AdzunaClient {
    pub fn new(
        source: JobSource,
        context: SourceContext,
        base_url: impl Into<String>,
        country: impl Into<String>,
        app_id: Option<String>,
        app_key: Option<String>,
    ) -> Self {
        Self {
            source,
            context,
            base_url: base_url.into(),
            country: country.into(),
            app_id,
            app_key,
        }
    }

    fn build_url(&self, params: &SearchParams, app_id: &str, app_key: &str) -> Result<Url> {
        let page = params.page.unwrap_or(1).max(1);
        let mut url = Url::parse(&format!(
            "{}/{}/search/{}",
            self.base_url.trim_end_matches('/'),
            self.country,
            page
        ))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("app_id", app_id)
                .append_pair("app_key", app_key)
                .append_pair(
                    "results_per_page",
                    &params.limit.unwrap_or(DEFAULT_PAGE_SIZE).to_string(),
                )
                .append_pair("content-type", "application/json");

            if let Some(what) = params.query.as_deref().filter(|q| !q.trim().is_empty()) {
                query.append_pair("what", what);
            }
            if let Some(location) = params.location.as_deref().filter(|l| !l.trim().is_empty()) {
                query.append_pair("where", location);
            }
            if let Some(radius) = params.radius {
                query.append_pair("distance", &radius.to_string());
            }
            match params.job_type.as_deref() {
                Some("Full-time") => {
                    query.append_pair("full_time", "1");
                }
                Some("Part-time") => {
                    query.append_pair("part_time", "1");
                }
                Some("Contract") => {
                    query.append_pair("contract", "1");
                }
                _ => {}
            }
        }

        Ok(url)
    }

    fn to_job(&self, raw: AdzunaJob) -> Job {
        let enricher = &self.context.enricher;
        let category = raw
            .category
            .and_then(|c| c.label)
            .unwrap_or_default();
        let job_type = match (raw.contract_time.as_deref(), raw.contract_type.as_deref()) {
            (_, Some("contract")) => "Contract".to_string(),
            (Some(time), _) => normalize_job_type(time),
            _ => normalize_job_type(""),
        };

        Job {
            id: format!("adzuna-{}", id_string(&raw.id)),
            experience: enricher.experience(&raw.title, &category),
            tags: enricher.tags(&raw.description),
            is_ai_recommended: enricher.is_ai_recommended(&raw.title, &raw.description),
            company: raw
                .company
                .and_then(|c| c.display_name)
                .unwrap_or_else(|| "Unknown Company".to_string()),
            location: raw
                .location
                .and_then(|l| l.display_name)
                .unwrap_or_else(|| "Not specified".to_string()),
            salary: format_salary(raw.salary_min, raw.salary_max),
            job_type,
            date_posted: raw.created.as_deref().and_then(parse_date).unwrap_or_else(Utc::now),
            title: raw.title,
            description: raw.description,
            url: raw.redirect_url,
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

#[async_trait]
impl SourceClient for AdzunaClient {
    fn source(&self) -> &JobSource {
        &self.source
    }

    fn is_configured(&self) -> bool {
        self.app_id.is_some() && self.app_key.is_some()
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<Job>> {
        let (Some(app_id), Some(app_key)) = (self.app_id.as_deref(), self.app_key.as_deref()) else {
            return Err(AggregatorError::NotConfigured {
                source_name: self.source.name.clone(),
                missing: "ADZUNA_APP_ID/ADZUNA_APP_KEY",
            });
        };
        self.context.check_rate_limit(&self.source)?;

        let url = self.build_url(params, app_id, app_key)?;
        let fetcher = &self.context.fetcher;
        let response: AdzunaResponse = fetcher.send_json(&self.source.name, fetcher.get(url)).await?;

        let jobs: Vec<Job> = response.results.into_iter().map(|raw| self.to_job(raw)).collect();
        info!("Adzuna returned {} jobs", jobs.len());
        Ok(jobs)
    }
}
