use crate::config::USER_SUBMISSIONS_SOURCE;
use crate::enrichment::{Enricher, DEFAULT_JOB_TYPE};
use crate::processing::filter;
use crate::types::{AggregatorError, Job, JobSource, JobSubmission, Result, SearchParams};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A posted job plus moderation state.
#[derive(Debug, Clone)]
pub struct StoredSubmission {
    pub id: String,
    pub submission: JobSubmission,
    pub verified: bool,
    pub submitted_at: DateTime<Utc>,
}

/// User-posted jobs. Nothing is surfaced until a moderator verifies it.
pub struct UserSubmissionStore {
    submissions: RwLock<IndexMap<String, StoredSubmission>>,
    enricher: Arc<dyn Enricher>,
    source: JobSource,
}

impl UserSubmissionStore {
    pub fn new(enricher: Arc<dyn Enricher>) -> Self {
        Self {
            submissions: RwLock::new(IndexMap::new()),
            enricher,
            source: JobSource::new(USER_SUBMISSIONS_SOURCE, u32::MAX, 5),
        }
    }

    pub async fn submit(&self, submission: JobSubmission) -> Result<String> {
        validate(&submission)?;

        let now = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!("user-{}-{}", now.timestamp_millis(), &suffix[..9]);

        info!("New job submission {} for {} at {}", id, submission.title, submission.company);
        self.submissions.write().await.insert(
            id.clone(),
            StoredSubmission {
                id: id.clone(),
                submission,
                verified: false,
                submitted_at: now,
            },
        );
        Ok(id)
    }

    pub async fn verify(&self, id: &str) -> bool {
        match self.submissions.write().await.get_mut(id) {
            Some(stored) => {
                stored.verified = true;
                info!("Verified job submission {}", id);
                true
            }
            None => {
                warn!("Cannot verify unknown submission {}", id);
                false
            }
        }
    }

    pub async fn delete(&self, id: &str) -> bool {
        let removed = self.submissions.write().await.shift_remove(id).is_some();
        if removed {
            info!("Deleted job submission {}", id);
        }
        removed
    }

    pub async fn get(&self, id: &str) -> Option<StoredSubmission> {
        self.submissions.read().await.get(id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.submissions.read().await.len()
    }

    pub async fn verified_count(&self) -> usize {
        self.submissions.read().await.values().filter(|s| s.verified).count()
    }

    /// A verified submission as a `Job`. Unverified ids yield `None`.
    pub async fn verified_job(&self, id: &str) -> Option<Job> {
        self.submissions
            .read()
            .await
            .get(id)
            .filter(|stored| stored.verified)
            .map(|stored| self.to_job(stored))
    }

    /// Verified submissions matching `params`, in submission order.
    pub async fn list_verified_as_jobs(&self, params: &SearchParams) -> Vec<Job> {
        let jobs: Vec<Job> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|stored| stored.verified)
            .map(|stored| self.to_job(stored))
            .collect();

        debug!("{} verified user jobs before filtering", jobs.len());
        filter(jobs, params)
    }

    fn to_job(&self, stored: &StoredSubmission) -> Job {
        let submission = &stored.submission;
        let remote =
            submission.remote == Some(true) || submission.location.to_lowercase().contains("remote");
        let tags = if submission.tags.is_empty() {
            self.enricher.tags(&submission.description)
        } else {
            submission.tags.clone()
        };

        Job {
            id: stored.id.clone(),
            title: submission.title.clone(),
            company: submission.company.clone(),
            location: submission.location.clone(),
            salary: submission.salary.clone(),
            job_type: submission
                .job_type
                .clone()
                .unwrap_or_else(|| DEFAULT_JOB_TYPE.to_string()),
            experience: submission
                .experience
                .unwrap_or_else(|| self.enricher.experience(&submission.title, "")),
            tags,
            date_posted: stored.submitted_at,
            description: submission.description.clone(),
            url: submission.url.clone(),
            source: self.source.clone(),
            is_ai_recommended: self
                .enricher
                .is_ai_recommended(&submission.title, &submission.description),
            remote: Some(remote),
            equity: submission.equity.clone(),
            requirements: submission.requirements.clone(),
            benefits: submission.benefits.clone(),
            applicants: Some(0),
            views: Some(0),
        }
    }
}

fn validate(submission: &JobSubmission) -> Result<()> {
    let required = [
        ("title", &submission.title),
        ("company", &submission.company),
        ("description", &submission.description),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(AggregatorError::InvalidSubmission(format!("{} is required", field)));
    }
    if !submission.contact_email.contains('@') {
        return Err(AggregatorError::InvalidSubmission(format!(
            "invalid contact email: {}",
            submission.contact_email
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::KeywordEnricher;
    use crate::types::ExperienceLevel;

    fn store() -> UserSubmissionStore {
        UserSubmissionStore::new(Arc::new(KeywordEnricher::default()))
    }

    fn submission(title: &str, location: &str) -> JobSubmission {
        JobSubmission {
            title: title.to_string(),
            company: "Tiny Startup".to_string(),
            location: location.to_string(),
            salary: Some("$80k - $100k".to_string()),
            description: "Ship React features with a small team".to_string(),
            contact_email: "founder@tiny.example".to_string(),
            ..JobSubmission::default()
        }
    }

    #[tokio::test]
    async fn submissions_start_unverified() {
        let store = store();
        let id = store.submit(submission("Frontend Engineer", "Remote")).await.unwrap();

        assert!(id.starts_with("user-"));
        assert_eq!(id.split('-').count(), 3);
        assert_eq!(store.count().await, 1);
        assert_eq!(store.verified_count().await, 0);
        assert!(store.list_verified_as_jobs(&SearchParams::default()).await.is_empty());
        assert!(store.verified_job(&id).await.is_none());
    }

    #[tokio::test]
    async fn verified_submissions_become_jobs() {
        let store = store();
        let id = store.submit(submission("Senior Frontend Engineer", "Remote")).await.unwrap();
        assert!(store.verify(&id).await);

        let jobs = store.list_verified_as_jobs(&SearchParams::default()).await;
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.id, id);
        assert_eq!(job.source.name, USER_SUBMISSIONS_SOURCE);
        assert_eq!(job.source.priority, 5);
        assert_eq!(job.experience, ExperienceLevel::Senior);
        assert_eq!(job.job_type, DEFAULT_JOB_TYPE);
        assert_eq!(job.remote, Some(true));
        assert_eq!(job.tags, vec!["React".to_string()]);
    }

    #[tokio::test]
    async fn verified_jobs_respect_filters() {
        let store = store();
        let remote = store.submit(submission("Frontend Engineer", "Remote")).await.unwrap();
        let onsite = store.submit(submission("Office Engineer", "Boston, MA")).await.unwrap();
        store.verify(&remote).await;
        store.verify(&onsite).await;

        let params = SearchParams {
            remote: Some(false),
            ..SearchParams::default()
        };
        let jobs = store.list_verified_as_jobs(&params).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, onsite);
    }

    #[tokio::test]
    async fn remote_location_wins_over_a_false_flag() {
        let store = store();
        let mut flagged_onsite = submission("Frontend Engineer", "Remote - US");
        flagged_onsite.remote = Some(false);
        let flagged_remote = JobSubmission {
            remote: Some(true),
            ..submission("Backend Engineer", "Boston, MA")
        };
        let first = store.submit(flagged_onsite).await.unwrap();
        let second = store.submit(flagged_remote).await.unwrap();
        store.verify(&first).await;
        store.verify(&second).await;

        let jobs = store.list_verified_as_jobs(&SearchParams::default()).await;
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|job| job.remote == Some(true) && job.is_remote()));
    }

    #[tokio::test]
    async fn unknown_ids_are_rejected() {
        let store = store();
        assert!(!store.verify("user-0-missing").await);
        assert!(!store.delete("user-0-missing").await);
    }

    #[tokio::test]
    async fn delete_removes_the_submission() {
        let store = store();
        let id = store.submit(submission("Frontend Engineer", "Remote")).await.unwrap();
        assert!(store.delete(&id).await);
        assert!(store.get(&id).await.is_none());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn invalid_submissions_are_refused() {
        let store = store();

        let mut missing_title = submission("", "Remote");
        missing_title.title = "   ".to_string();
        assert!(matches!(
            store.submit(missing_title).await,
            Err(AggregatorError::InvalidSubmission(_))
        ));

        let mut bad_email = submission("Engineer", "Remote");
        bad_email.contact_email = "not-an-email".to_string();
        assert!(matches!(
            store.submit(bad_email).await,
            Err(AggregatorError::InvalidSubmission(_))
        ));
        assert_eq!(store.count().await, 0);
    }
}
