//! # Grounded News
//!
//! Collects a deduplicated list of structured news records for a keyword
//! from an LLM agent that fronts a news-search tool.
//!
//! The agent's replies are unreliable: fenced, prose-wrapped, `null`, or
//! truncated. A single filtered query also often returns too little. The
//! pipeline therefore plans progressively relaxed queries, sanitizes every
//! reply into a JSON array, and merges passes into a first-seen-wins list,
//! degrading every per-pass or per-article failure to a soft failure.
//!
//! ## Usage
//!
//! ```ignore
//! let collector = NewsCollector::new(agent, QueryPlanner::default(), CollectorSettings::default());
//! let options = SearchOptions::new(Freshness::Week, "ko-KR", 20, ["etnews.com", "zdnet.co.kr"])?;
//! let collection = collector.collect("KT", &options).await?;
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod prompts;
pub mod utils;

pub use error::PipelineError;
pub use models::{Article, Collection, Freshness, QueryVariant, SearchOptions, Sentiment, SoftFailure};
