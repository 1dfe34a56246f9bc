//! # Grounded News CLI
//!
//! Collects news for a keyword through an LLM agent with a news-search
//! tool, deduplicates the results across progressively relaxed passes,
//! optionally summarizes each article, and writes JSON, Markdown and CSV output.
//!
//! ## Usage
//!
//! ```sh
//! grounded_news KT --sites-file presets/kr_it.txt -j ./json -m ./markdown --csv-output-dir ./csv
//! ```
//!
//! ## Pipeline
//!
//! 1. **Planning**: site-scoped query, reduced site scope, bare keyword
//! 2. **Collection**: one agent call per pass until enough unique articles
//! 3. **Enrichment**: summaries and sentiment, 8 articles at a time by default
//! 4. **Output**: JSON file, Markdown report and CSV export (or JSON on stdout)

use awful_aj::{config, config_dir, template};
use clap::Parser;
use grounded_news::api::{AgentClient, LlmSummarizer, RetryAsk};
use grounded_news::cli::Cli;
use grounded_news::config::PipelineConfig;
use grounded_news::outputs::{csv, json, markdown};
use grounded_news::pipeline::{Enricher, NewsCollector, QueryPlanner};
use grounded_news::utils::ensure_writable_dir;
use std::error::Error;
use std::future::{Future, pending};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

/// Default pipeline config file name inside the awful_aj config directory.
const PIPELINE_CONFIG_FILE: &str = "grounded_news.yaml";

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("grounded_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Pipeline configuration ----
    let mut settings = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => {
            let default_path = config_dir()?.join(PIPELINE_CONFIG_FILE);
            if default_path.exists() {
                PipelineConfig::load(&default_path)?
            } else {
                info!(path = %default_path.display(), "No pipeline config found; using defaults");
                PipelineConfig::default()
            }
        }
    };
    settings.apply_cli(&args)?;
    let options = settings.search_options()?;
    let offset = settings.collector_settings().window_offset();

    // Early check: fail before spending agent calls on an unwritable output dir
    let output_dirs = [&args.json_output_dir, &args.markdown_output_dir, &args.csv_output_dir];
    for dir in output_dirs.into_iter().flatten() {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Output directory is not writable (fix perms or choose a different path)");
            return Err(e);
        }
    }

    // ---- LLM configuration & templates ----
    let conf_file = config_dir()?.join("config.yaml");
    let config_path = conf_file.to_str().ok_or("config path is not valid UTF-8")?;
    let llm_config = config::load_config(config_path)?;
    info!(config_path, "Loaded LLM configuration");
    let search_template = template::load_template(&settings.search_template).await?;
    info!(template = %settings.search_template, "Loaded search template");

    // ---- Collect ----
    let agent = RetryAsk::new(
        AgentClient::new(&llm_config, &search_template, settings.per_pass_request_cap),
        settings.retry_attempts,
        Duration::from_millis(settings.retry_base_delay_ms),
    );
    let collector = NewsCollector::new(
        agent,
        QueryPlanner::new(settings.reduced_site_count),
        settings.collector_settings(),
    );

    let deadline = args.deadline_secs.map(Duration::from_secs);
    let mut collection = collector
        .collect_until(&args.keyword, &options, stop_signal(tokio::signal::ctrl_c(), deadline))
        .await?;

    // ---- Enrich ----
    if settings.enrich && !collection.articles.is_empty() {
        let summary_template = template::load_template(&settings.summary_template).await?;
        info!(template = %settings.summary_template, "Loaded summary template");

        let summarizer = RetryAsk::new(
            LlmSummarizer {
                config: &llm_config,
                template: &summary_template,
            },
            1,
            Duration::from_millis(settings.retry_base_delay_ms),
        );
        let enricher = Enricher::new(
            summarizer,
            settings.enrichment_concurrency,
            Duration::from_secs(settings.enrichment_timeout_secs),
        );

        let articles = std::mem::take(&mut collection.articles);
        let (articles, failures) = enricher.enrich_all(articles).await;
        collection.articles = articles;
        collection.soft_failures.extend(failures);
    }

    // ---- Output ----
    if let Some(dir) = &args.json_output_dir {
        match json::write_collection(&collection, dir, offset).await {
            Ok(path) => info!(path = %path.display(), "JSON output written"),
            Err(e) => error!(error = %e, "Failed to write JSON"),
        }
    }
    if let Some(dir) = &args.markdown_output_dir {
        match markdown::write_report(&collection, dir, offset).await {
            Ok(path) => info!(path = %path.display(), "Markdown output written"),
            Err(e) => error!(error = %e, "Failed to write Markdown"),
        }
    }
    if let Some(dir) = &args.csv_output_dir {
        match csv::write_collection(&collection, dir, offset).await {
            Ok(path) => info!(path = %path.display(), "CSV output written"),
            Err(e) => error!(error = %e, "Failed to write CSV"),
        }
    }
    if output_dirs.iter().all(|dir| dir.is_none()) {
        println!("{}", serde_json::to_string_pretty(&collection)?);
    }

    if !collection.soft_failures.is_empty() {
        warn!(count = collection.soft_failures.len(), "Completed with soft failures");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        articles = collection.articles.len(),
        passes = collection.pass_count_used,
        cancelled = collection.cancelled,
        "Execution complete"
    );

    Ok(())
}

/// Resolves on `interrupt` (Ctrl-C) or when the optional deadline passes.
///
/// An interrupt listener that fails to install never fires.
async fn stop_signal<I>(interrupt: I, deadline: Option<Duration>)
where
    I: Future<Output = std::io::Result<()>>,
{
    let deadline = async {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => pending::<()>().await,
        }
    };
    let interrupt = async {
        match interrupt.await {
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, "Could not listen for Ctrl-C; only the deadline applies");
                pending::<()>().await;
            }
        }
    };
    tokio::select! {
        _ = interrupt => warn!("Interrupted; finishing with partial results"),
        _ = deadline => warn!("Deadline reached; finishing with partial results"),
    }
}
