//! The retrieval-and-normalization pipeline.
//!
//! # Stages
//!
//! 1. [`planner`]: Emit query variants from most specific to bare keyword
//! 2. [`orchestrator`]: Run one pass per variant until enough articles are held
//! 3. [`sanitizer`]: Recover a JSON array from each agent reply
//! 4. [`window`]: Drop articles outside the requested freshness period
//! 5. [`dedup`]: Merge passes into an ordered, duplicate-free list
//! 6. [`enricher`]: Optionally summarize and score each article concurrently

pub mod dedup;
pub mod enricher;
pub mod orchestrator;
pub mod planner;
pub mod sanitizer;
pub mod window;

pub use dedup::Deduplicator;
pub use enricher::Enricher;
pub use orchestrator::{CollectorSettings, NewsCollector};
pub use planner::QueryPlanner;
pub use sanitizer::{Extracted, extract_json_array};
