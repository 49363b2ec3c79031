//! Keyword heuristics shared by every source when normalizing records into `Job`.
//!
//! The keyword lists live in [`KeywordEnricher`] as plain data so they can be
//! swapped or extended without touching the source clients.

use crate::types::ExperienceLevel;
use regex::Regex;
use std::sync::LazyLock;

static LOCATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\b[Bb]ased in|\b[Ll]ocation:|\bin|\bat)\s+([A-Z][A-Za-z]+(?:,?\s[A-Z][A-Za-z]+)*)",
    )
    .expect("location pattern is valid")
});

pub const DEFAULT_LOCATION: &str = "Remote";
pub const DEFAULT_JOB_TYPE: &str = "Full-time";

/// Derives the fields no upstream source reports consistently.
pub trait Enricher: Send + Sync {
    /// Seniority from the title and an optional category label.
    fn experience(&self, title: &str, category: &str) -> ExperienceLevel;

    /// Known skill keywords found in the text, capped.
    fn tags(&self, text: &str) -> Vec<String>;

    fn is_ai_recommended(&self, title: &str, description: &str) -> bool;

    /// Location mentioned in a free-text description, for sources without a location field.
    fn infer_location(&self, description: &str) -> String;

    /// Employment type mentioned in a free-text description.
    fn infer_job_type(&self, description: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct KeywordEnricher {
    pub senior_keywords: Vec<String>,
    pub entry_keywords: Vec<String>,
    pub tag_vocabulary: Vec<String>,
    pub max_tags: usize,
    pub ai_keywords: Vec<String>,
}

impl Default for KeywordEnricher {
    fn default() -> Self {
        Self {
            senior_keywords: strings(&["senior", "lead"]),
            entry_keywords: strings(&["junior", "entry"]),
            tag_vocabulary: strings(&[
                "JavaScript",
                "TypeScript",
                "React",
                "Node.js",
                "Python",
                "Java",
                "Go",
                "Rust",
                "AWS",
                "Docker",
                "Kubernetes",
                "SQL",
                "PostgreSQL",
                "MongoDB",
                "GraphQL",
                "Vue",
                "Angular",
                "Machine Learning",
                "AI",
                "DevOps",
            ]),
            max_tags: 5,
            ai_keywords: strings(&["ai", "machine learning", "data science", "python", "senior"]),
        }
    }
}

impl Enricher for KeywordEnricher {
    fn experience(&self, title: &str, category: &str) -> ExperienceLevel {
        let haystack = format!("{} {}", title, category).to_lowercase();
        if self.senior_keywords.iter().any(|k| haystack.contains(k.as_str())) {
            ExperienceLevel::Senior
        } else if self.entry_keywords.iter().any(|k| haystack.contains(k.as_str())) {
            ExperienceLevel::Entry
        } else {
            ExperienceLevel::MidLevel
        }
    }

    fn tags(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        self.tag_vocabulary
            .iter()
            .filter(|keyword| text.contains(&keyword.to_lowercase()))
            .take(self.max_tags)
            .cloned()
            .collect()
    }

    fn is_ai_recommended(&self, title: &str, description: &str) -> bool {
        let haystack = format!("{} {}", title, description).to_lowercase();
        self.ai_keywords.iter().any(|k| haystack.contains(k.as_str()))
    }

    fn infer_location(&self, description: &str) -> String {
        LOCATION_PATTERN
            .captures(description)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().trim_end_matches(',').to_string())
            .filter(|location| !location.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string())
    }

    fn infer_job_type(&self, description: &str) -> String {
        let text = description.to_lowercase();
        if text.contains("part-time") {
            "Part-time".to_string()
        } else if text.contains("contract") || text.contains("freelance") {
            "Contract".to_string()
        } else if text.contains("internship") || text.contains("intern") {
            "Internship".to_string()
        } else {
            DEFAULT_JOB_TYPE.to_string()
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Formats a yearly pay range as `$60k - $90k`, or `$60k+` when only a floor is known.
pub fn format_salary(min: Option<f64>, max: Option<f64>) -> Option<String> {
    let to_k = |value: f64| (value / 1000.0).round() as i64;
    match (min.filter(|v| *v > 0.0), max.filter(|v| *v > 0.0)) {
        (Some(min), Some(max)) => Some(format!("${}k - ${}k", to_k(min), to_k(max))),
        (Some(min), None) => Some(format!("${}k+", to_k(min))),
        (None, Some(max)) => Some(format!("Up to ${}k", to_k(max))),
        (None, None) => None,
    }
}

/// Extract clean text content from HTML
pub fn strip_html(html: &str) -> String {
    html.chars()
        .fold((String::new(), false), |(mut text, in_tag), c| match c {
            '<' => (text, true),
            '>' => {
                text.push(' ');
                (text, false)
            }
            _ if !in_tag => {
                text.push(c);
                (text, in_tag)
            }
            _ => (text, in_tag),
        })
        .0
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
