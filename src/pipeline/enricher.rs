//! Per-article summarization and sentiment.
//!
//! Articles are independent, so enrichment runs as a bounded set of
//! concurrent calls. Each call owns exactly one slot of the output and has
//! its own timeout; a failed or slow call leaves only its own article with
//! empty enrichment fields.

use crate::api::Summarizer;
use crate::error::PipelineError;
use crate::models::{Article, SoftFailure};
use futures::stream::{self, StreamExt};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug)]
pub struct Enricher<S> {
    summarizer: S,
    concurrency: usize,
    timeout: Duration,
}

impl<S: Summarizer> Enricher<S> {
    pub fn new(summarizer: S, concurrency: usize, timeout: Duration) -> Self {
        Self {
            summarizer,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    pub fn summarizer(&self) -> &S {
        &self.summarizer
    }

    /// Enrich one article. Already-enriched articles are returned unchanged.
    pub async fn enrich(&self, mut article: Article) -> Result<Article, PipelineError> {
        if article.is_enriched() {
            return Ok(article);
        }

        let text = article.enrichment_text();
        let reply = tokio::time::timeout(self.timeout, self.summarizer.summarize_and_score(&text)).await;
        match reply {
            Ok(Ok((summary, sentiment))) => {
                article.apply_enrichment(summary, sentiment);
                Ok(article)
            }
            Ok(Err(e)) => Err(PipelineError::EnrichmentFailure(e.to_string())),
            Err(_) => Err(PipelineError::EnrichmentFailure(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Enrich every article, preserving order and count.
    ///
    /// Returns the articles plus one soft failure per article that could not
    /// be enriched.
    #[instrument(level = "info", skip_all, fields(count = articles.len(), concurrency = self.concurrency))]
    pub async fn enrich_all(&self, articles: Vec<Article>) -> (Vec<Article>, Vec<SoftFailure>) {
        let t0 = Instant::now();
        let total = articles.len();
        let mut slots: Vec<Option<Article>> = vec![None; total];
        let mut failures = Vec::new();

        let results: Vec<(usize, Article, Option<PipelineError>)> =
            stream::iter(articles.into_iter().enumerate())
                .map(|(i, article)| async move {
                    let fallback = article.clone();
                    match self.enrich(article).await {
                        Ok(enriched) => {
                            debug!(index = i, "Enriched article");
                            (i, enriched, None)
                        }
                        Err(e) => {
                            warn!(index = i, title = %fallback.title, error = %e, "Enrichment failed; keeping article without summary");
                            (i, fallback, Some(e))
                        }
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        for (i, article, error) in results {
            slots[i] = Some(article);
            if let Some(error) = error {
                failures.push(SoftFailure {
                    variant: None,
                    article_index: Some(i),
                    error,
                });
            }
        }
        failures.sort_by_key(|f| f.article_index);

        let enriched: Vec<Article> = slots.into_iter().flatten().collect();
        info!(
            total,
            enriched = total - failures.len(),
            failed = failures.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "Enrichment complete"
        );
        (enriched, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;
    use std::cell::RefCell;
    use std::error::Error;
    use std::future::pending;

    /// Fails for any article whose title contains "fail", hangs on "hang".
    #[derive(Default)]
    struct FakeSummarizer {
        seen: RefCell<Vec<String>>,
    }

    impl Summarizer for FakeSummarizer {
        async fn summarize_and_score(&self, text: &str) -> Result<(String, Sentiment), Box<dyn Error>> {
            self.seen.borrow_mut().push(text.to_string());
            if text.contains("hang") {
                pending::<()>().await;
            }
            if text.contains("fail") {
                return Err("model overloaded".into());
            }
            Ok((format!("summary of {}", text.lines().next().unwrap_or("")), Sentiment::Neutral))
        }
    }

    fn articles(titles: &[&str]) -> Vec<Article> {
        titles
            .iter()
            .map(|t| Article::new(*t, "", "src", None, Some(format!("https://a.com/{t}"))))
            .collect()
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_article() {
        let enricher = Enricher::new(FakeSummarizer::default(), 3, Duration::from_secs(5));
        let input = articles(&["one", "two", "three fail", "four", "five"]);

        let (out, failures) = enricher.enrich_all(input.clone()).await;

        assert_eq!(out.len(), 5);
        for (i, article) in out.iter().enumerate() {
            assert_eq!(article.url, input[i].url, "order preserved");
            if i == 2 {
                assert!(article.summary.is_none());
                assert!(article.sentiment.is_none());
            } else {
                assert_eq!(article.summary.as_deref(), Some(format!("summary of {}", input[i].title).as_str()));
                assert_eq!(article.sentiment, Some(Sentiment::Neutral));
            }
        }
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].article_index, Some(2));
        assert!(matches!(failures[0].error, PipelineError::EnrichmentFailure(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out_alone() {
        let enricher = Enricher::new(FakeSummarizer::default(), 2, Duration::from_secs(1));
        let (out, failures) = enricher.enrich_all(articles(&["a", "hang", "c"])).await;

        assert_eq!(out.len(), 3);
        assert!(out[0].summary.is_some());
        assert!(out[1].summary.is_none());
        assert!(out[2].summary.is_some());
        assert_eq!(failures.len(), 1);
        match &failures[0].error {
            PipelineError::EnrichmentFailure(msg) => assert!(msg.contains("timed out")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_already_enriched_articles_are_not_resent() {
        let enricher = Enricher::new(FakeSummarizer::default(), 2, Duration::from_secs(5));
        let mut input = articles(&["done", "todo"]);
        input[0].apply_enrichment("kept".to_string(), Sentiment::Positive);

        let (out, failures) = enricher.enrich_all(input).await;

        assert!(failures.is_empty());
        assert_eq!(out[0].summary.as_deref(), Some("kept"));
        assert_eq!(out[0].sentiment, Some(Sentiment::Positive));
        assert_eq!(enricher.summarizer().seen.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let enricher = Enricher::new(FakeSummarizer::default(), 4, Duration::from_secs(5));
        let (out, failures) = enricher.enrich_all(Vec::new()).await;
        assert!(out.is_empty());
        assert!(failures.is_empty());
    }
}
