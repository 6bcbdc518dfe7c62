//! Market News
//!
//! A fixed set of market headlines. Each item's impact is scored from its
//! text by counting positive and negative keywords.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

const POSITIVE_KEYWORDS: &[&str] = &["rally", "gains", "growth", "optimism", "surge", "boost"];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "decline",
    "fall",
    "drop",
    "uncertainty",
    "headwinds",
    "concerns",
];

/// (id, title, summary, source, hours ago)
const HEADLINES: &[(&str, &str, &str, &str, i64)] = &[
    (
        "1",
        "Tech Stocks Rally on AI Optimism",
        "Major tech companies see gains as AI adoption accelerates across industries.",
        "Financial Times",
        0,
    ),
    (
        "2",
        "Federal Reserve Hints at Rate Stability",
        "Latest Fed comments suggest interest rates may remain stable through Q4.",
        "Reuters",
        2,
    ),
    (
        "3",
        "Energy Sector Faces Headwinds",
        "Oil prices decline amid global economic uncertainty.",
        "Bloomberg",
        4,
    ),
];

/// Expected market effect of a headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// More positive than negative keywords.
    Positive,
    /// More negative than positive keywords.
    Negative,
    /// Balanced or no keywords.
    Neutral,
}

/// One headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    /// Stable identifier.
    pub id: &'static str,
    /// Headline.
    pub title: &'static str,
    /// One-sentence summary.
    pub summary: &'static str,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Publisher.
    pub source: &'static str,
    /// Scored impact.
    pub impact: Impact,
}

/// Score a headline by keyword counts (case-insensitive).
#[must_use]
pub fn analyze_impact(title: &str, summary: &str) -> Impact {
    let text = format!("{title} {summary}").to_lowercase();
    let count = |keywords: &[&str]| keywords.iter().filter(|k| text.contains(*k)).count();

    let positive = count(POSITIVE_KEYWORDS);
    let negative = count(NEGATIVE_KEYWORDS);

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Impact::Positive,
        std::cmp::Ordering::Less => Impact::Negative,
        std::cmp::Ordering::Equal => Impact::Neutral,
    }
}

/// Current headlines, newest first, dated relative to `now`.
#[must_use]
pub fn market_news(now: DateTime<Utc>) -> Vec<NewsItem> {
    HEADLINES
        .iter()
        .map(|&(id, title, summary, source, hours_ago)| NewsItem {
            id,
            title,
            summary,
            published_at: now - Duration::hours(hours_ago),
            source,
            impact: analyze_impact(title, summary),
        })
        .collect()
}
