//! Collaborator interfaces and their LLM-backed implementations.
//!
//! The pipeline talks to two external capabilities:
//! - [`SearchAgent`]: an LLM agent with a news-search grounding tool that
//!   answers a query with (ideally) a JSON array of articles
//! - [`Summarizer`]: a text-generation model that summarizes an article and
//!   scores its sentiment
//!
//! # Architecture
//!
//! - [`AgentClient`] and [`LlmSummarizer`] adapt `awful_aj::api::ask` to the
//!   two traits
//! - [`RetryAsk`] is a decorator that adds exponential backoff to either
//!
//! # Retry Strategy
//!
//! - Configurable attempt count (3 by default)
//! - Exponential backoff starting at the base delay, capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::models::{SearchOptions, Sentiment};
use crate::pipeline::sanitizer::extract_json_object;
use crate::prompts;
use crate::utils::truncate_for_log;
use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// A search agent that answers a query with raw text.
pub trait SearchAgent {
    /// Run `query` through the agent's search tool.
    ///
    /// The returned text is whatever the agent produced; it is not expected
    /// to be valid JSON.
    async fn ask(&self, query: &str, options: &SearchOptions) -> Result<String, Box<dyn Error>>;
}

/// A text-generation capability that summarizes and scores an article.
pub trait Summarizer {
    async fn summarize_and_score(
        &self,
        article_text: &str,
    ) -> Result<(String, Sentiment), Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to a collaborator.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T> {
    /// Wrap `inner`, retrying up to `max_retries` times after the first failure.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = AgentClient::new(&config, &template, 20);
    /// let retry_client = RetryAsk::new(client, 3, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }

    async fn retry<R, F, Fut>(&self, what: &'static str, mut op: F) -> Result<R, Box<dyn Error>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, Box<dyn Error>>>,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match op().await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            what,
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        what,
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: SearchAgent> SearchAgent for RetryAsk<T> {
    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, query: &str, options: &SearchOptions) -> Result<String, Box<dyn Error>> {
        self.retry("search", || self.inner.ask(query, options)).await
    }
}

impl<T: Summarizer> Summarizer for RetryAsk<T> {
    #[instrument(level = "debug", skip_all)]
    async fn summarize_and_score(
        &self,
        article_text: &str,
    ) -> Result<(String, Sentiment), Box<dyn Error>> {
        self.retry("summarize", || self.inner.summarize_and_score(article_text))
            .await
    }
}

/// [`SearchAgent`] backed by `awful_aj::api::ask` and a chat template whose
/// system prompt enables the news-search tool.
#[derive(Debug)]
pub struct AgentClient<'a> {
    /// LLM configuration (API keys, endpoints, model settings).
    pub config: &'a AwfulJadeConfig,
    /// Chat template defining the agent's conversation structure.
    pub template: &'a ChatTemplate,
    /// Maximum number of articles requested per pass.
    pub per_pass_cap: usize,
}

impl<'a> AgentClient<'a> {
    pub fn new(config: &'a AwfulJadeConfig, template: &'a ChatTemplate, per_pass_cap: usize) -> Self {
        Self {
            config,
            template,
            per_pass_cap,
        }
    }
}

impl SearchAgent for AgentClient<'_> {
    #[instrument(level = "info", skip_all, fields(query = %query))]
    async fn ask(&self, query: &str, options: &SearchOptions) -> Result<String, Box<dyn Error>> {
        let count = options.max_results.min(self.per_pass_cap).max(1);
        let prompt = prompts::search_prompt(query, options, count);

        let t0 = Instant::now();
        let res = ask(self.config, prompt, self.template, None, None).await;
        let dt = t0.elapsed();

        match &res {
            Ok(text) => debug!(
                elapsed_ms = dt.as_millis(),
                response_preview = %truncate_for_log(text, 200),
                "Agent answered"
            ),
            Err(e) => warn!(elapsed_ms = dt.as_millis(), error = %e, "Agent call failed"),
        }
        res
    }
}

/// [`Summarizer`] backed by `awful_aj::api::ask`.
#[derive(Debug)]
pub struct LlmSummarizer<'a> {
    pub config: &'a AwfulJadeConfig,
    pub template: &'a ChatTemplate,
}

impl Summarizer for LlmSummarizer<'_> {
    #[instrument(level = "debug", skip_all)]
    async fn summarize_and_score(
        &self,
        article_text: &str,
    ) -> Result<(String, Sentiment), Box<dyn Error>> {
        let prompt = prompts::summary_prompt(article_text);
        let raw = ask(self.config, prompt, self.template, None, None).await?;
        parse_enrichment(&raw)
    }
}

/// Parse a `{"summary": "...", "sentiment": "..."}` reply.
pub fn parse_enrichment(raw: &str) -> Result<(String, Sentiment), Box<dyn Error>> {
    let obj = extract_json_object(raw)
        .ok_or_else(|| format!("no JSON object in reply: {}", truncate_for_log(raw, 120)))?;

    let summary = obj
        .get("summary")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("reply has no summary")?
        .to_string();

    let sentiment = obj
        .get("sentiment")
        .and_then(|v| v.as_str())
        .ok_or("reply has no sentiment")?
        .parse::<Sentiment>()?;

    Ok((summary, sentiment))
}
