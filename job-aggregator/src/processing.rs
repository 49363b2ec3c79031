use crate::types::{Job, SalaryRange, SearchParams};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

static SALARY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$?\s*(\d[\d,]*)(?:\.\d+)?\s*(k)?\s*(?:-|–|to)\s*\$?\s*(\d[\d,]*)(?:\.\d+)?\s*(k)?")
        .expect("salary pattern is valid")
});

/// One step of the post-fetch pipeline
pub trait ProcessingStage: Send + Sync {
    fn process(&self, jobs: Vec<Job>, params: &SearchParams) -> Vec<Job>;

    fn stage_name(&self) -> &'static str;
}

pub struct DedupStage;

impl ProcessingStage for DedupStage {
    fn process(&self, jobs: Vec<Job>, _params: &SearchParams) -> Vec<Job> {
        dedupe(jobs)
    }

    fn stage_name(&self) -> &'static str {
        "dedupe"
    }
}

pub struct RankStage;

impl ProcessingStage for RankStage {
    fn process(&self, jobs: Vec<Job>, params: &SearchParams) -> Vec<Job> {
        rank(jobs, params)
    }

    fn stage_name(&self) -> &'static str {
        "rank"
    }
}

pub struct FilterStage;

impl ProcessingStage for FilterStage {
    fn process(&self, jobs: Vec<Job>, params: &SearchParams) -> Vec<Job> {
        filter(jobs, params)
    }

    fn stage_name(&self) -> &'static str {
        "filter"
    }
}

/// Dedupe, then rank, then filter. Filtering runs last so survivors keep their rank order.
pub fn default_stages() -> Vec<Box<dyn ProcessingStage>> {
    vec![Box::new(DedupStage), Box::new(RankStage), Box::new(FilterStage)]
}

/// Collapses jobs sharing a title/company/location key (case-insensitive).
/// The first occurrence wins.
pub fn dedupe(jobs: Vec<Job>) -> Vec<Job> {
    let before = jobs.len();
    let mut seen = HashSet::new();
    let unique: Vec<Job> = jobs
        .into_iter()
        .filter(|job| seen.insert(job.dedup_key()))
        .collect();

    let removed = before - unique.len();
    if removed > 0 {
        debug!("Removed {} duplicate jobs", removed);
    }
    unique
}

pub fn score(job: &Job, now: DateTime<Utc>) -> f64 {
    let mut score = 0.0;

    if job.is_ai_recommended {
        score += 10.0;
    }
    if job.salary.is_some() {
        score += 5.0;
    }
    score += job.tags.len() as f64;
    score += (job.description.chars().count() as f64 / 100.0).min(5.0);

    let days_since_posted = now.signed_duration_since(job.date_posted).num_days();
    score += (10 - days_since_posted).max(0) as f64;

    score
}

pub fn rank(jobs: Vec<Job>, params: &SearchParams) -> Vec<Job> {
    rank_at(jobs, params, Utc::now())
}

/// Sorts by descending score. The sort is stable, so equal scores keep input order.
pub fn rank_at(jobs: Vec<Job>, _params: &SearchParams, now: DateTime<Utc>) -> Vec<Job> {
    let mut scored: Vec<(f64, Job)> = jobs.into_iter().map(|job| (score(&job, now), job)).collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, job)| job).collect()
}

/// Applies every constraint set in `params`; unset fields do not filter.
pub fn filter(jobs: Vec<Job>, params: &SearchParams) -> Vec<Job> {
    let before = jobs.len();
    let location = params
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_lowercase);

    let kept: Vec<Job> = jobs
        .into_iter()
        .filter(|job| {
            location
                .as_deref()
                .map_or(true, |wanted| job.location.to_lowercase().contains(wanted))
        })
        .filter(|job| {
            params
                .salary_range
                .map_or(true, |range| salary_matches(job.salary.as_deref(), range))
        })
        .filter(|job| params.job_type.as_deref().map_or(true, |t| job.job_type == t))
        .filter(|job| params.experience_level.map_or(true, |level| job.experience == level))
        .filter(|job| params.remote.map_or(true, |remote| job.is_remote() == remote))
        .collect();

    debug!("Filter kept {}/{} jobs", kept.len(), before);
    kept
}

/// Extracts a `(min, max)` yearly range in dollars from strings like
/// `$60k - $90k` or `$60,000 - $90,000`.
///
/// Pay quoted per interval, such as `$25.50 - $40.00 (PH)`, has no yearly
/// range and yields `None`.
pub fn parse_salary_bounds(salary: &str) -> Option<(u64, u64)> {
    if salary.trim_end().ends_with(')') {
        return None;
    }
    let caps = SALARY_PATTERN.captures(salary)?;
    let amount = |digits: usize, suffix: usize| -> Option<u64> {
        let value: u64 = caps.get(digits)?.as_str().replace(',', "").parse().ok()?;
        Some(if caps.get(suffix).is_some() { value * 1000 } else { value })
    };

    let low = amount(1, 2)?;
    let high = amount(3, 4)?;
    Some((low.min(high), low.max(high)))
}

/// Unknown or unparseable salaries never exclude a job.
pub fn salary_matches(salary: Option<&str>, range: SalaryRange) -> bool {
    let Some((low, high)) = salary.and_then(parse_salary_bounds) else {
        return true;
    };
    let (bucket_low, bucket_high) = range.bounds();
    high >= bucket_low && bucket_high.map_or(true, |max| low <= max)
}
