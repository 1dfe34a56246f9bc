//! Markdown report of a collection.
//!
//! The report lists articles in collection order (earlier, more specific
//! passes first), with a table of contents, a sentiment tally when
//! enrichment ran, and a section for soft failures.

use crate::models::{Collection, Sentiment};
use crate::outputs::json::file_stem;
use crate::utils::{slugify_title, upcase};
use chrono::FixedOffset;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Write;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Render the collection as Markdown.
pub fn collection_to_markdown(collection: &Collection, offset: FixedOffset) -> String {
    let mut md = String::new();
    let collected = collection.collected_at.with_timezone(&offset);

    writeln!(md, "# News: {}\n", collection.keyword).unwrap();
    writeln!(
        md,
        "_{} article(s) · freshness {} · market {} · {} pass(es) · collected {}_\n",
        collection.articles.len(),
        collection.options.freshness,
        collection.options.market,
        collection.pass_count_used,
        collected.format("%Y-%m-%d %H:%M %:z"),
    )
    .unwrap();

    if collection.cancelled {
        writeln!(md, "> Collection was stopped early; results are partial.\n").unwrap();
    }

    if collection.articles.is_empty() {
        writeln!(md, "No articles found. Try a broader keyword or a longer freshness period.").unwrap();
    } else {
        let mut tally: BTreeMap<String, usize> = BTreeMap::new();
        for sentiment in collection.articles.iter().filter_map(|a| a.sentiment) {
            *tally.entry(sentiment.to_string()).or_default() += 1;
        }
        if !tally.is_empty() {
            let line = tally
                .iter()
                .map(|(label, n)| format!("{} {}", upcase(label), n))
                .collect::<Vec<_>>()
                .join(" · ");
            writeln!(md, "**Sentiment:** {line}\n").unwrap();
        }

        writeln!(md, "## Contents\n").unwrap();
        for article in &collection.articles {
            writeln!(md, "- [{}](#{})", article.title, slugify_title(&article.title)).unwrap();
        }
        writeln!(md).unwrap();

        for article in &collection.articles {
            writeln!(md, "## {}\n", article.title).unwrap();

            let mut meta = Vec::new();
            if !article.source_name.is_empty() {
                meta.push(article.source_name.clone());
            } else if let Some(domain) = article.domain() {
                meta.push(domain);
            }
            if let Some(published) = article.published_at {
                meta.push(published.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string());
            }
            if let Some(sentiment) = article.sentiment {
                meta.push(format!("{} {}", sentiment_marker(sentiment), sentiment));
            }
            if !meta.is_empty() {
                writeln!(md, "_{}_\n", meta.join(" · ")).unwrap();
            }

            if let Some(summary) = &article.summary {
                writeln!(md, "{summary}\n").unwrap();
            } else if !article.snippet.is_empty() {
                writeln!(md, "{}\n", article.snippet).unwrap();
            }

            if let Some(url) = &article.url {
                writeln!(md, "[Read the article]({url})\n").unwrap();
            }
        }
    }

    if !collection.soft_failures.is_empty() {
        writeln!(md, "## Issues\n").unwrap();
        for failure in &collection.soft_failures {
            match (&failure.variant, failure.article_index) {
                (Some(variant), _) => writeln!(
                    md,
                    "- Pass {} (`{}`): {}",
                    variant.pass_index + 1,
                    variant.text,
                    failure.error
                )
                .unwrap(),
                (None, Some(i)) => writeln!(md, "- Article {}: {}", i + 1, failure.error).unwrap(),
                (None, None) => writeln!(md, "- {}", failure.error).unwrap(),
            }
        }
    }

    md
}

fn sentiment_marker(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "▲",
        Sentiment::Negative => "▼",
        Sentiment::Neutral => "■",
    }
}

/// Write the Markdown report to `{dir}/{date}_{keyword-slug}.md`.
#[instrument(level = "info", skip_all, fields(markdown_output_dir = %markdown_output_dir))]
pub async fn write_report(
    collection: &Collection,
    markdown_output_dir: &str,
    offset: FixedOffset,
) -> Result<PathBuf, Box<dyn Error>> {
    let md = collection_to_markdown(collection, offset);
    let local_date = collection.collected_at.with_timezone(&offset).date_naive();

    fs::create_dir_all(markdown_output_dir).await?;
    let path = PathBuf::from(markdown_output_dir)
        .join(format!("{}_{}.md", local_date, file_stem(&collection.keyword)));
    fs::write(&path, md).await?;
    info!(path = %path.display(), "Wrote Markdown report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::models::{Article, Freshness, QueryVariant, SearchOptions, SoftFailure};
    use chrono::{TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn collection(articles: Vec<Article>, soft_failures: Vec<SoftFailure>) -> Collection {
        Collection {
            keyword: "KT".to_string(),
            options: SearchOptions::new(Freshness::Week, "ko-KR", 5, ["etnews.com"]).unwrap(),
            articles,
            pass_count_used: 2,
            soft_failures,
            cancelled: false,
            collected_at: Utc.with_ymd_and_hms(2025, 5, 6, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_report_lists_articles_in_order() {
        let mut first = Article::new(
            "First Story",
            "first snippet",
            "ETNews",
            None,
            Some("https://etnews.com/1".to_string()),
        );
        first.apply_enrichment("first summary".to_string(), Sentiment::Positive);
        let second = Article::new("Second Story", "second snippet", "ZDNet", None, None);

        let md = collection_to_markdown(&collection(vec![first, second], vec![]), utc());

        assert!(md.starts_with("# News: KT"));
        assert!(md.contains("- [First Story](#first-story)"));
        assert!(md.find("## First Story").unwrap() < md.find("## Second Story").unwrap());
        assert!(md.contains("first summary"));
        assert!(!md.contains("first snippet"));
        assert!(md.contains("second snippet"));
        assert!(md.contains("**Sentiment:** Positive 1"));
        assert!(md.contains("[Read the article](https://etnews.com/1)"));
    }

    #[test]
    fn test_report_falls_back_to_domain_without_source() {
        let article = Article::new(
            "Untitled Source",
            "",
            "",
            None,
            Some("https://www.hankyung.com/article/1".to_string()),
        );
        let md = collection_to_markdown(&collection(vec![article], vec![]), utc());
        assert!(md.contains("_hankyung.com_"));
    }

    #[test]
    fn test_report_lists_soft_failures() {
        let failures = vec![
            SoftFailure {
                variant: Some(QueryVariant {
                    text: "KT AND (site:etnews.com)".to_string(),
                    pass_index: 0,
                    relaxation_level: 0,
                }),
                article_index: None,
                error: PipelineError::ToolFailure("quota exceeded".to_string()),
            },
            SoftFailure {
                variant: None,
                article_index: Some(2),
                error: PipelineError::EnrichmentFailure("timed out".to_string()),
            },
        ];
        let md = collection_to_markdown(&collection(vec![], failures), utc());
        assert!(md.contains("No articles found"));
        assert!(md.contains("## Issues"));
        assert!(md.contains("- Pass 1 (`KT AND (site:etnews.com)`): search tool failure: quota exceeded"));
        assert!(md.contains("- Article 3: enrichment failure: timed out"));
    }

    #[tokio::test]
    async fn test_write_report() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let path = write_report(&collection(vec![], vec![]), dir, utc()).await.unwrap();
        assert!(path.ends_with("2025-05-06_kt.md"));
        assert!(std::fs::read_to_string(path).unwrap().contains("# News: KT"));
    }
}
