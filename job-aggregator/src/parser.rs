use crate::enrichment::strip_html;
use crate::types::{AggregatorError, ParsedEntry, ParsedFeed, Result};
use chrono::Utc;
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info};

/// Turns raw RSS/Atom XML into [`ParsedFeed`] entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed(&self, content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let content = Self::normalize_encoding(content)?;
        let feed = parser::parse(content.as_bytes())
            .map_err(|e| AggregatorError::Parse(format!("Failed to parse feed: {}", e)))?;

        // Duplicate items inside one feed are dropped here; cross-source
        // duplicates are handled later by content key.
        let mut seen_guids = HashSet::new();
        let mut seen_urls = HashSet::new();
        let mut entries = Vec::new();

        for entry in feed.entries {
            if let Some(parsed_entry) = Self::parse_entry(entry) {
                if let Some(ref guid) = parsed_entry.guid {
                    if !seen_guids.insert(guid.clone()) {
                        debug!("Skipping duplicate entry with GUID: {}", guid);
                        continue;
                    }
                }
                if !seen_urls.insert(parsed_entry.url.clone()) {
                    debug!("Skipping duplicate entry with URL: {}", parsed_entry.url);
                    continue;
                }
                entries.push(parsed_entry);
            }
        }

        info!("Parsed feed with {} entries", entries.len());

        Ok(ParsedFeed { entries })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> Option<ParsedEntry> {
        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())?;

        let url = entry.links.first()?.href.clone();

        let guid = if !entry.id.is_empty() {
            Some(entry.id.clone())
        } else {
            None
        };

        // Prefer the summary (RSS <description>), fall back to full content
        let raw_description = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));

        let categories = entry.categories.into_iter().map(|c| c.term).collect();

        Some(ParsedEntry {
            guid,
            url,
            title,
            description: strip_html(&raw_description),
            published_at,
            categories,
        })
    }

    pub fn normalize_encoding(content: &str) -> Result<String> {
        let normalized = content
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .trim()
            .to_string();

        if normalized.is_empty() {
            return Err(AggregatorError::Parse("Empty content after normalization".to_string()));
        }

        Ok(normalized)
    }
}
