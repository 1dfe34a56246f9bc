//! Multi-pass retrieval.
//!
//! [`NewsCollector::collect`] walks the planner's variants one at a time,
//! asks the search agent, sanitizes the reply, maps entries to articles and
//! merges them into a deduplicated accumulator until `max_results` unique
//! articles are held or the variants run out.
//!
//! Passes are strictly sequential: whether the next, looser variant is tried
//! depends on how many articles the earlier passes produced. Every per-pass
//! failure is recorded as a soft failure and the run continues.

use crate::api::SearchAgent;
use crate::error::PipelineError;
use crate::models::{Article, Collection, PassResult, QueryVariant, SearchOptions, SoftFailure};
use crate::pipeline::dedup::Deduplicator;
use crate::pipeline::planner::QueryPlanner;
use crate::pipeline::sanitizer::{Extracted, extract_json_array};
use crate::pipeline::window::filter_fresh;
use crate::utils::truncate_for_log;
use chrono::{FixedOffset, Offset, Utc};
use std::future::{Future, pending};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Tunables for a collector. Per-request options live in [`SearchOptions`].
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Upper bound on a single agent call, retries included.
    pub pass_timeout: Duration,
    /// Re-check publication times against the freshness window.
    pub freshness_window: bool,
    /// UTC offset, in hours, in which calendar days/weeks/months are evaluated.
    pub window_offset_hours: i32,
}

impl CollectorSettings {
    /// Falls back to UTC for out-of-range offsets.
    pub fn window_offset(&self) -> FixedOffset {
        self.window_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            pass_timeout: Duration::from_secs(180),
            freshness_window: true,
            window_offset_hours: 9,
        }
    }
}

/// Drives planner, agent, sanitizer and deduplicator for one keyword at a time.
///
/// Holds no per-run state, so one collector may serve any number of
/// sequential or concurrent `collect` calls.
#[derive(Debug)]
pub struct NewsCollector<A> {
    agent: A,
    planner: QueryPlanner,
    settings: CollectorSettings,
}

impl<A: SearchAgent> NewsCollector<A> {
    pub fn new(agent: A, planner: QueryPlanner, settings: CollectorSettings) -> Self {
        Self {
            agent,
            planner,
            settings,
        }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Collect up to `options.max_results` unique articles for `keyword`.
    ///
    /// # Errors
    ///
    /// Only [`PipelineError::InvalidConfig`], before any agent call.
    pub async fn collect(
        &self,
        keyword: &str,
        options: &SearchOptions,
    ) -> Result<Collection, PipelineError> {
        self.collect_until(keyword, options, pending::<()>()).await
    }

    /// Like [`collect`](Self::collect), but stops as soon as `cancel`
    /// resolves and returns what has been accumulated so far with
    /// `cancelled` set.
    #[instrument(level = "info", skip_all, fields(keyword = %keyword, max_results = options.max_results))]
    pub async fn collect_until<C>(
        &self,
        keyword: &str,
        options: &SearchOptions,
        cancel: C,
    ) -> Result<Collection, PipelineError>
    where
        C: Future<Output = ()>,
    {
        let keyword = keyword.trim();
        validate(keyword, options)?;

        let t0 = Instant::now();
        let mut accumulator = Deduplicator::new();
        let mut soft_failures = Vec::new();
        let mut pass_count_used = 0usize;
        let mut cancelled = false;
        tokio::pin!(cancel);

        for variant in self.planner.plan(keyword, options) {
            if accumulator.len() >= options.max_results {
                break;
            }
            let pass_index = variant.pass_index;

            let pass = tokio::select! {
                biased;
                _ = &mut cancel => {
                    warn!(pass = pass_index, "Collection cancelled; returning partial results");
                    cancelled = true;
                    break;
                }
                pass = self.run_pass(variant, options) => pass,
            };
            pass_count_used += 1;

            let parsed = pass.parsed_articles.len();
            let duplicates = pass
                .parsed_articles
                .iter()
                .filter(|a| accumulator.contains(a))
                .count();
            let added = accumulator.merge_bounded(pass.parsed_articles, options.max_results);
            info!(
                pass = pass.variant.pass_index,
                relaxation = pass.variant.relaxation_level,
                parsed,
                duplicates,
                added,
                total = accumulator.len(),
                "Pass complete"
            );

            if let Some(error) = pass.parse_error {
                soft_failures.push(SoftFailure {
                    variant: Some(pass.variant),
                    article_index: None,
                    error,
                });
            }
        }

        info!(
            articles = accumulator.len(),
            passes = pass_count_used,
            soft_failures = soft_failures.len(),
            cancelled,
            elapsed_ms = t0.elapsed().as_millis(),
            "Collection finished"
        );

        Ok(Collection {
            keyword: keyword.to_string(),
            options: options.clone(),
            articles: accumulator.into_articles(),
            pass_count_used,
            soft_failures,
            cancelled,
            collected_at: Utc::now(),
        })
    }

    /// One agent call plus sanitization and mapping. Never fails: errors are
    /// carried in [`PassResult::parse_error`].
    #[instrument(level = "debug", skip_all, fields(pass = variant.pass_index, query = %variant.text))]
    async fn run_pass(&self, variant: QueryVariant, options: &SearchOptions) -> PassResult {
        let reply = tokio::time::timeout(
            self.settings.pass_timeout,
            self.agent.ask(&variant.text, options),
        )
        .await;

        let raw = match reply {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(query = %variant.text, error = %e, "Search tool failed; treating pass as empty");
                return PassResult {
                    variant,
                    raw_response_text: None,
                    parsed_articles: Vec::new(),
                    parse_error: Some(PipelineError::ToolFailure(e.to_string())),
                };
            }
            Err(_) => {
                warn!(query = %variant.text, timeout = ?self.settings.pass_timeout, "Search tool timed out; treating pass as empty");
                return PassResult {
                    variant,
                    raw_response_text: None,
                    parsed_articles: Vec::new(),
                    parse_error: Some(PipelineError::ToolFailure(format!(
                        "timed out after {:?}",
                        self.settings.pass_timeout
                    ))),
                };
            }
        };

        let (parsed_articles, parse_error) = match extract_json_array(&raw) {
            Extracted::Empty => {
                debug!("Agent reported no results");
                (Vec::new(), None)
            }
            Extracted::Articles(items) => {
                let articles = items.iter().filter_map(Article::from_raw).collect::<Vec<_>>();
                let articles = if self.settings.freshness_window {
                    filter_fresh(articles, options.freshness, Utc::now(), self.settings.window_offset())
                } else {
                    articles
                };
                (articles, None)
            }
            Extracted::ParseError(preview) => {
                warn!(
                    query = %variant.text,
                    response_preview = %truncate_for_log(&preview, 200),
                    "Agent returned non-conforming JSON; treating pass as empty"
                );
                (Vec::new(), Some(PipelineError::MalformedResponse { preview }))
            }
        };

        PassResult {
            variant,
            raw_response_text: Some(raw),
            parsed_articles,
            parse_error,
        }
    }
}

fn validate(keyword: &str, options: &SearchOptions) -> Result<(), PipelineError> {
    if keyword.is_empty() {
        return Err(PipelineError::InvalidConfig("keyword must not be empty".to_string()));
    }
    if options.max_results == 0 {
        return Err(PipelineError::InvalidConfig(
            "max_results must be at least 1".to_string(),
        ));
    }
    Ok(())
}
