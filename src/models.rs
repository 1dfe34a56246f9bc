//! Data models for collected news articles and the retrieval run around them.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Article`]: A normalized news record mapped from the agent's raw JSON
//! - [`SearchOptions`]: Immutable per-request search configuration
//! - [`QueryVariant`]: One query attempt emitted by the planner
//! - [`PassResult`]: The ephemeral outcome of a single pass
//! - [`Collection`]: The final ordered article list plus run metadata
//!
//! Raw agent objects are loosely shaped, so mapping into [`Article`] tolerates
//! missing keys, alternative key names and scalar entries.

use crate::error::PipelineError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Upper bound on `max_results` for a single collection.
pub const MAX_RESULTS_CAP: usize = 50;

/// Overall tone of an article as judged by the enrichment model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "pos" => Ok(Sentiment::Positive),
            "negative" | "neg" => Ok(Sentiment::Negative),
            "neutral" | "mixed" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment label: {other}")),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

/// A single news record.
///
/// Core fields are fixed at creation. Only the enrichment fields
/// (`summary`, `sentiment`) may be filled later, and only once, through
/// [`Article::apply_enrichment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// The article title/headline.
    pub title: String,
    /// Short excerpt returned by the search tool.
    pub snippet: String,
    /// Publisher name as reported by the agent.
    pub source_name: String,
    /// Publication time, when the agent returned a parseable one.
    pub published_at: Option<DateTime<Utc>>,
    /// Canonical link to the article.
    pub url: Option<String>,
    /// Tone assigned during enrichment.
    pub sentiment: Option<Sentiment>,
    /// Short summary produced during enrichment.
    pub summary: Option<String>,
}

impl Article {
    /// Build an article from the core search fields with empty enrichment.
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        source_name: impl Into<String>,
        published_at: Option<DateTime<Utc>>,
        url: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            source_name: source_name.into(),
            published_at,
            url,
            sentiment: None,
            summary: None,
        }
    }

    /// Map one raw JSON entry from the agent into an article.
    ///
    /// Objects are read field by field with nullable defaults; string and
    /// number scalars become a title-only article. Returns `None` for entries
    /// that carry neither a url nor a title.
    pub fn from_raw(value: &Value) -> Option<Self> {
        let article = match value {
            Value::Object(obj) => Self::from_object(obj),
            Value::String(s) => Self::new(s.trim(), "", "", None, None),
            Value::Number(n) => Self::new(n.to_string(), "", "", None, None),
            _ => return None,
        };

        if article.url.is_none() && article.title.is_empty() {
            return None;
        }
        Some(article)
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        let title = first_str(obj, &["title", "headline", "name"]).unwrap_or_default();
        let snippet = first_str(obj, &["snippet", "description", "summary"]).unwrap_or_default();
        let source_name = first_str(obj, &["source", "source_name", "publisher"])
            .or_else(|| {
                // Bing-style `{"provider": [{"name": "..."}]}`
                obj.get("provider")
                    .and_then(|p| p.as_array())
                    .and_then(|a| a.first())
                    .and_then(|p| p.get("name"))
                    .and_then(|n| n.as_str())
                    .map(|s| s.trim().to_string())
            })
            .unwrap_or_default();
        let published_at = first_str(obj, &["published", "published_at", "datePublished", "date"])
            .and_then(|s| parse_published(&s));
        let url = first_str(obj, &["url", "link"]).filter(|u| !u.is_empty());

        Self::new(title, snippet, source_name, published_at, url)
    }

    /// Text handed to the enrichment model.
    pub fn enrichment_text(&self) -> String {
        if self.snippet.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n\n{}", self.title, self.snippet)
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.summary.is_some() || self.sentiment.is_some()
    }

    /// Fill the enrichment fields. Returns `false` and leaves the article
    /// untouched if it was already enriched.
    pub fn apply_enrichment(&mut self, summary: String, sentiment: Sentiment) -> bool {
        if self.is_enriched() {
            return false;
        }
        self.summary = Some(summary);
        self.sentiment = Some(sentiment);
        true
    }

    /// Extract the registrable domain label from the url, e.g.
    /// `"https://www.zdnet.co.kr/view"` -> `"zdnet.co.kr"`.
    pub fn domain(&self) -> Option<String> {
        let parsed = url::Url::parse(self.url.as_deref()?).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        Some(host.trim_start_matches("www.").to_string())
    }
}

fn first_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Parse a publication timestamp as returned by the agent.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (assumed UTC) and bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(head) = s.get(..19) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S") {
            return Some(naive.and_utc());
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S") {
            return Some(naive.and_utc());
        }
    }
    s.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Search recency filter understood by the news tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Freshness {
    Day,
    #[default]
    Week,
    Month,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Freshness::Day => "Day",
            Freshness::Week => "Week",
            Freshness::Month => "Month",
        };
        f.write_str(label)
    }
}

/// Immutable search configuration for a single collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub freshness: Freshness,
    /// Market/language code, e.g. `ko-KR`.
    pub market: String,
    pub max_results: usize,
    /// Ordered, de-duplicated list of domains.
    pub site_filters: Vec<String>,
}

impl SearchOptions {
    /// Build options, normalizing site filters and clamping `max_results`
    /// to [`MAX_RESULTS_CAP`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `max_results` is zero or
    /// a site filter contains whitespace after normalization.
    pub fn new<I, S>(
        freshness: Freshness,
        market: impl Into<String>,
        max_results: usize,
        site_filters: I,
    ) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if max_results == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_results must be at least 1".to_string(),
            ));
        }

        let site_filters = site_filters
            .into_iter()
            .filter_map(|s| normalize_site(s.as_ref()))
            .unique()
            .collect::<Vec<_>>();

        if let Some(bad) = site_filters.iter().find(|s| s.contains(char::is_whitespace)) {
            return Err(PipelineError::InvalidConfig(format!(
                "site filter is not a domain: {bad:?}"
            )));
        }

        Ok(Self {
            freshness,
            market: market.into(),
            max_results: max_results.min(MAX_RESULTS_CAP),
            site_filters,
        })
    }
}

fn normalize_site(raw: &str) -> Option<String> {
    let s = raw.trim().to_lowercase();
    let s = s.strip_prefix("site:").unwrap_or(&s);
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    let s = s.strip_prefix("www.").unwrap_or(s).trim_end_matches('/');
    (!s.is_empty()).then(|| s.to_string())
}

/// One query attempt produced by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryVariant {
    pub text: String,
    /// Position in the emitted sequence, starting at 0.
    pub pass_index: usize,
    /// 0 is the most specific (full site filter), higher is looser.
    pub relaxation_level: u8,
}

/// Outcome of one pass. Lives only for the duration of a collection run.
#[derive(Debug)]
pub struct PassResult {
    pub variant: QueryVariant,
    pub raw_response_text: Option<String>,
    pub parsed_articles: Vec<Article>,
    pub parse_error: Option<PipelineError>,
}

/// A non-fatal error recorded against the variant (or article) it hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftFailure {
    /// Absent for per-article enrichment failures.
    pub variant: Option<QueryVariant>,
    /// Article position for enrichment failures.
    pub article_index: Option<usize>,
    pub error: PipelineError,
}

/// Final output of a collection run, read by renderers and exporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub keyword: String,
    pub options: SearchOptions,
    pub articles: Vec<Article>,
    /// Passes that ran to completion; a pass interrupted by cancellation is not counted.
    pub pass_count_used: usize,
    pub soft_failures: Vec<SoftFailure>,
    /// Set when the run was stopped by the caller's cancellation signal.
    pub cancelled: bool,
    pub collected_at: DateTime<Utc>,
}
