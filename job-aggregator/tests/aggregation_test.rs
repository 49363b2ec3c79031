use async_trait::async_trait;
use chrono::Utc;
use job_aggregator::{
    AggregationService, AggregatorConfig, AggregatorError, ExperienceLevel, FetchConfig, Job,
    JobBoard, JobSource, JobSubmission, Result, RssFeed, SearchParams, SourceClient,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("job_aggregator=debug")
            .with_test_writer()
            .try_init();
    });
}

const CAREERS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Acme Careers</title>
    <link>https://acme.example/careers</link>
    <description>Open roles</description>
    <item>
      <title>Platform Engineer</title>
      <link>https://acme.example/careers/1</link>
      <guid>acme-1</guid>
      <description>Kubernetes and Go, based in Denver.</description>
    </item>
    <item>
      <title>Support Specialist</title>
      <link>https://acme.example/careers/2</link>
      <guid>acme-2</guid>
      <description>A part-time customer support role.</description>
    </item>
  </channel>
</rss>"#;

enum Behaviour {
    Jobs(Vec<Job>),
    Fail(u16),
}

struct FakeSource {
    source: JobSource,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl FakeSource {
    fn returning(name: &str, jobs: Vec<Job>) -> Arc<Self> {
        Arc::new(Self {
            source: JobSource::new(name, 100, 1),
            behaviour: Behaviour::Jobs(jobs),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(name: &str, status: u16) -> Arc<Self> {
        Arc::new(Self {
            source: JobSource::new(name, 100, 1),
            behaviour: Behaviour::Fail(status),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceClient for FakeSource {
    fn source(&self) -> &JobSource {
        &self.source
    }

    async fn search(&self, _params: &SearchParams) -> Result<Vec<Job>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Jobs(jobs) => Ok(jobs.clone()),
            Behaviour::Fail(status) => Err(AggregatorError::HttpStatus {
                source_name: self.source.name.clone(),
                status: *status,
            }),
        }
    }
}

fn job(id: &str, title: &str, company: &str, location: &str, source: &str) -> Job {
    Job {
        id: id.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        salary: None,
        job_type: "Full-time".to_string(),
        experience: ExperienceLevel::MidLevel,
        tags: Vec::new(),
        date_posted: Utc::now(),
        description: "Build things".to_string(),
        url: None,
        source: JobSource::new(source, 100, 1),
        is_ai_recommended: false,
        remote: None,
        equity: None,
        requirements: Vec::new(),
        benefits: Vec::new(),
        applicants: None,
        views: None,
    }
}

fn config(feeds: Vec<RssFeed>) -> AggregatorConfig {
    AggregatorConfig {
        feeds,
        fetch: FetchConfig {
            timeout_seconds: 5,
            max_retries: 0,
            retry_delay_seconds: 0,
            ..FetchConfig::default()
        },
        ..AggregatorConfig::default()
    }
}

#[tokio::test]
async fn case_variants_collapse_into_one_job() {
    init_tracing();
    let first = FakeSource::returning(
        "Board A",
        vec![
            job("a-1", "Senior Engineer", "Acme", "Remote", "Board A"),
            job("a-2", "Data Analyst", "Acme", "Remote", "Board A"),
        ],
    );
    let second = FakeSource::returning(
        "Board B",
        vec![job("b-1", "senior engineer", "ACME", "remote", "Board B")],
    );
    let clients: Vec<Arc<dyn SourceClient>> = vec![first, second];
    let service = AggregationService::builder(config(Vec::new()))
        .clients(clients)
        .build()
        .unwrap();

    let result = service.aggregate_jobs(&SearchParams::default()).await;

    assert_eq!(result.total, 2);
    assert_eq!(result.jobs.len(), 2);
    assert!(!result.cache_hit);
    // First occurrence wins, so Board B contributes nothing.
    assert!(result.jobs.iter().any(|job| job.id == "a-1"));
    assert_eq!(result.sources, vec!["Board A".to_string()]);
}

#[tokio::test]
async fn rss_jobs_survive_when_every_api_fails() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/careers.rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CAREERS_FEED))
        .mount(&server)
        .await;

    let clients: Vec<Arc<dyn SourceClient>> = vec![
        FakeSource::failing("Adzuna", 500),
        FakeSource::failing("USAJobs", 503),
        FakeSource::failing("GitHub Jobs", 404),
    ];
    let feeds = vec![RssFeed::new("Acme Careers", format!("{}/careers.rss", server.uri()), "Acme")];
    let service = AggregationService::builder(config(feeds))
        .clients(clients)
        .build()
        .unwrap();

    let result = service.aggregate_jobs(&SearchParams::default()).await;

    assert_eq!(result.total, 2);
    assert_eq!(result.errors.len(), 3);
    assert!(result.errors.iter().any(|e| e.contains("HTTP 503")));
    assert_eq!(result.sources, vec!["Company RSS Feeds".to_string()]);
    assert!(result.jobs.iter().all(|job| job.company == "Acme"));
}

#[tokio::test]
async fn identical_request_is_served_from_cache() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/careers.rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CAREERS_FEED))
        .mount(&server)
        .await;

    let board = FakeSource::returning("Board A", vec![job("a-1", "Analyst", "Acme", "Austin, TX", "Board A")]);
    let clients: Vec<Arc<dyn SourceClient>> = vec![board.clone()];
    let feeds = vec![RssFeed::new("Acme Careers", format!("{}/careers.rss", server.uri()), "Acme")];
    let service = AggregationService::builder(config(feeds))
        .clients(clients)
        .build()
        .unwrap();

    let params = SearchParams {
        query: Some("engineer".to_string()),
        location: Some("Denver".to_string()),
        ..SearchParams::default()
    };
    let first = service.aggregate_jobs(&params).await;
    let second = service.aggregate_jobs(&params).await;

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(board.calls(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    let first_ids: Vec<_> = first.jobs.iter().map(|job| job.id.clone()).collect();
    let second_ids: Vec<_> = second.jobs.iter().map(|job| job.id.clone()).collect();
    assert_eq!(first_ids, second_ids);
    assert_eq!(first.sources, second.sources);

    // A different query is a different key.
    let other = service.aggregate_jobs(&SearchParams::with_query("designer")).await;
    assert!(!other.cache_hit);
    assert_eq!(board.calls(), 2);
}

#[tokio::test]
async fn cache_hit_replays_jobs_that_share_an_id() {
    init_tracing();
    let clients: Vec<Arc<dyn SourceClient>> = vec![
        FakeSource::returning("Board A", vec![job("dup-0", "Analyst", "Acme", "Austin, TX", "Board A")]),
        FakeSource::returning("Board B", vec![job("dup-0", "Designer", "Globex", "Boston, MA", "Board B")]),
    ];
    let service = AggregationService::builder(config(Vec::new()))
        .clients(clients)
        .build()
        .unwrap();

    let params = SearchParams::default();
    let first = service.aggregate_jobs(&params).await;
    let second = service.aggregate_jobs(&params).await;

    assert_eq!(first.total, 2);
    assert!(second.cache_hit);
    assert_eq!(second.total, first.total);
    assert_eq!(second.jobs, first.jobs);
}

#[tokio::test]
async fn submissions_are_visible_only_after_verification() {
    init_tracing();
    let service = AggregationService::builder(config(Vec::new()))
        .clients(Vec::new())
        .build()
        .unwrap();

    let submission = JobSubmission {
        title: "Founding Engineer".to_string(),
        company: "Tiny Startup".to_string(),
        location: "Remote".to_string(),
        description: "Own the whole stack".to_string(),
        contact_email: "founder@tiny.example".to_string(),
        ..JobSubmission::default()
    };
    let id = service.submit_job(submission).await.unwrap();

    let params = SearchParams::with_query("engineer");
    let before = service.aggregate_jobs(&params).await;
    assert!(before.jobs.iter().all(|job| job.id != id));
    assert!(service.get_job_by_id(&id).await.is_none());

    assert!(service.verify_user_job(&id).await);
    service.clear_cache().await;
    let after = service.aggregate_jobs(&params).await;
    assert!(!after.cache_hit);
    assert!(after.jobs.iter().any(|job| job.id == id));
    assert_eq!(after.sources, vec!["User Submissions".to_string()]);
    assert_eq!(service.get_job_by_id(&id).await.map(|job| job.id), Some(id.clone()));

    let stats = service.get_stats().await;
    assert_eq!(stats.user_submitted_job_count, 1);
    assert_eq!(stats.verified_user_job_count, 1);

    assert!(service.delete_user_job(&id).await);
    service.clear_cache().await;
    assert!(service.get_job_by_id(&id).await.is_none());
}

#[tokio::test]
async fn invalid_submission_is_rejected() {
    init_tracing();
    let service = AggregationService::builder(config(Vec::new()))
        .clients(Vec::new())
        .build()
        .unwrap();

    let result = service
        .submit_job(JobSubmission {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            description: "Build things".to_string(),
            contact_email: "nobody".to_string(),
            ..JobSubmission::default()
        })
        .await;
    assert!(matches!(result, Err(AggregatorError::InvalidSubmission(_))));
}

#[tokio::test]
async fn real_clients_against_mock_upstreams() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/adzuna/us/search/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "id": 11,
                "title": "Senior Data Scientist",
                "company": {"display_name": "Acme"},
                "location": {"display_name": "Remote"},
                "salary_min": 140000.0,
                "salary_max": 170000.0,
                "created": "2025-01-06T10:00:00Z",
                "description": "Python and machine learning"
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/github/positions.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "id": "gh-7",
            "type": "Full Time",
            "company": "Octo",
            "location": "Berlin",
            "title": "Backend Developer",
            "description": "<p>Rust services</p>"
        }])))
        .mount(&server)
        .await;

    let mut config = config(Vec::new());
    config.credentials.adzuna_app_id = Some("id".to_string());
    config.credentials.adzuna_app_key = Some("key".to_string());
    config.endpoints.adzuna_base_url = format!("{}/adzuna", server.uri());
    config.endpoints.github_jobs_base_url = format!("{}/github/positions.json", server.uri());
    let service = AggregationService::from_config(config).unwrap();

    let result = service.aggregate_jobs(&SearchParams::default()).await;

    assert_eq!(result.total, 2);
    // USAJobs has no key configured.
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("USAJobs"));
    // The salaried, AI-recommended Adzuna job outranks the GitHub one.
    assert_eq!(result.jobs[0].id, "adzuna-11");
    assert_eq!(result.jobs[1].id, "github-gh-7");

    let stats = service.get_stats().await;
    assert_eq!(stats.rate_limit_remaining.get("Adzuna"), Some(&999));
    assert_eq!(stats.rate_limit_remaining.get("GitHub Jobs"), Some(&59));
    assert_eq!(stats.rate_limit_remaining.get("USAJobs"), Some(&200));
}
