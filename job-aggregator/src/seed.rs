use crate::config::SEED_SOURCE;
use crate::types::{ExperienceLevel, Job, JobSource};
use chrono::{Duration, Utc};

struct SeedJob {
    title: &'static str,
    company: &'static str,
    location: &'static str,
    salary: Option<&'static str>,
    job_type: &'static str,
    experience: ExperienceLevel,
    tags: &'static [&'static str],
    days_ago: i64,
    description: &'static str,
    remote: bool,
    ai: bool,
}

const SEED: &[SeedJob] = &[
    SeedJob {
        title: "Senior Machine Learning Engineer",
        company: "Northwind Analytics",
        location: "San Francisco, CA",
        salary: Some("$160k - $210k"),
        job_type: "Full-time",
        experience: ExperienceLevel::Senior,
        tags: &["Python", "Machine Learning", "AWS"],
        days_ago: 1,
        description: "Design and ship production ML systems for forecasting and recommendations. \
            You will own model training pipelines in Python, feature stores on AWS, and the \
            monitoring that keeps models honest once they are live.",
        remote: false,
        ai: true,
    },
    SeedJob {
        title: "Frontend Developer",
        company: "Brightpath",
        location: "Remote",
        salary: Some("$90k - $120k"),
        job_type: "Full-time",
        experience: ExperienceLevel::MidLevel,
        tags: &["React", "TypeScript"],
        days_ago: 3,
        description: "Build accessible, fast interfaces in React and TypeScript for a résumé \
            builder used by thousands of job seekers every day.",
        remote: true,
        ai: false,
    },
    SeedJob {
        title: "Junior Backend Developer",
        company: "Harbor Logistics",
        location: "Austin, TX",
        salary: Some("$65k - $80k"),
        job_type: "Full-time",
        experience: ExperienceLevel::Entry,
        tags: &["Node.js", "PostgreSQL", "Docker"],
        days_ago: 6,
        description: "Join a small platform team maintaining Node.js services backed by \
            PostgreSQL. Mentorship and a clear growth path included.",
        remote: false,
        ai: false,
    },
    SeedJob {
        title: "DevOps Engineer",
        company: "Cloudline",
        location: "New York, NY",
        salary: None,
        job_type: "Contract",
        experience: ExperienceLevel::MidLevel,
        tags: &["Kubernetes", "Docker", "AWS", "DevOps"],
        days_ago: 12,
        description: "Six month contract to migrate legacy workloads onto Kubernetes.",
        remote: false,
        ai: false,
    },
    SeedJob {
        title: "Data Science Intern",
        company: "Northwind Analytics",
        location: "Remote",
        salary: None,
        job_type: "Internship",
        experience: ExperienceLevel::Entry,
        tags: &["Python", "SQL"],
        days_ago: 2,
        description: "Summer internship on the data science team working with Python and SQL.",
        remote: true,
        ai: true,
    },
];

/// Fixed job set mixed into results in development mode.
pub fn seed_jobs() -> Vec<Job> {
    let now = Utc::now();
    let source = JobSource::new(SEED_SOURCE, u32::MAX, 6);

    SEED.iter()
        .enumerate()
        .map(|(index, seed)| Job {
            id: format!("seed-{}", index + 1),
            title: seed.title.to_string(),
            company: seed.company.to_string(),
            location: seed.location.to_string(),
            salary: seed.salary.map(str::to_string),
            job_type: seed.job_type.to_string(),
            experience: seed.experience,
            tags: seed.tags.iter().map(|t| t.to_string()).collect(),
            date_posted: now - Duration::days(seed.days_ago),
            description: seed.description.to_string(),
            url: None,
            source: source.clone(),
            is_ai_recommended: seed.ai,
            remote: Some(seed.remote),
            equity: None,
            requirements: Vec::new(),
            benefits: Vec::new(),
            applicants: None,
            views: None,
        })
        .collect()
}
