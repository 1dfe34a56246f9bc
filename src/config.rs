//! Pipeline configuration loaded from YAML.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration. Command-line flags override file values through
//! [`PipelineConfig::apply_cli`].
//!
//! ```yaml
//! market: ko-KR
//! freshness: Month
//! max_results: 20
//! site_filters:
//!   - zdnet.co.kr
//!   - etnews.com
//! enrich: true
//! ```

use crate::cli::Cli;
use crate::error::PipelineError;
use crate::models::{Freshness, SearchOptions};
use crate::pipeline::orchestrator::CollectorSettings;
use crate::pipeline::planner::DEFAULT_REDUCED_SITE_COUNT;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub market: String,
    pub freshness: Freshness,
    pub max_results: usize,
    pub site_filters: Vec<String>,
    /// Domains kept by the simplified site-scoped pass.
    pub reduced_site_count: usize,
    pub pass_timeout_secs: u64,
    /// Maximum articles requested from the agent in one pass.
    pub per_pass_request_cap: usize,
    pub enrich: bool,
    pub enrichment_concurrency: usize,
    pub enrichment_timeout_secs: u64,
    pub freshness_window: bool,
    pub window_utc_offset_hours: i32,
    pub retry_attempts: usize,
    pub retry_base_delay_ms: u64,
    /// awful_aj template name for the search agent.
    pub search_template: String,
    /// awful_aj template name for the summarizer.
    pub summary_template: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            market: "ko-KR".to_string(),
            freshness: Freshness::Week,
            max_results: 20,
            site_filters: Vec::new(),
            reduced_site_count: DEFAULT_REDUCED_SITE_COUNT,
            pass_timeout_secs: 180,
            per_pass_request_cap: 20,
            enrich: true,
            enrichment_concurrency: 8,
            enrichment_timeout_secs: 60,
            freshness_window: true,
            window_utc_offset_hours: 9,
            retry_attempts: 3,
            retry_base_delay_ms: 1000,
            search_template: "news_search".to_string(),
            summary_template: "news_summary".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&text)?;
        info!("Loaded pipeline configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Override file values with anything given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<(), Box<dyn Error>> {
        if let Some(market) = &cli.market {
            self.market = market.clone();
        }
        if let Some(freshness) = cli.freshness {
            self.freshness = freshness;
        }
        if let Some(max_results) = cli.max_results {
            self.max_results = max_results;
        }
        if let Some(path) = &cli.sites_file {
            self.site_filters = load_site_filters(path)?;
        }
        if !cli.site.is_empty() {
            self.site_filters = cli.site.clone();
        }
        if cli.no_enrich {
            self.enrich = false;
        }
        debug!(config = ?self, "Effective configuration");
        Ok(())
    }

    pub fn search_options(&self) -> Result<SearchOptions, PipelineError> {
        SearchOptions::new(
            self.freshness,
            self.market.clone(),
            self.max_results,
            &self.site_filters,
        )
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            pass_timeout: Duration::from_secs(self.pass_timeout_secs),
            freshness_window: self.freshness_window,
            window_offset_hours: self.window_utc_offset_hours,
        }
    }
}

/// Read one domain per line; blank lines and `#` comments are skipped.
pub fn load_site_filters(path: impl AsRef<Path>) -> Result<Vec<String>, std::io::Error> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_yaml() {
        assert_eq!(PipelineConfig::from_yaml("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "market: en-US\nfreshness: Day\nsite_filters:\n  - etnews.com\n  - zdnet.co.kr\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.market, "en-US");
        assert_eq!(config.freshness, Freshness::Day);
        assert_eq!(config.site_filters, vec!["etnews.com", "zdnet.co.kr"]);
        assert_eq!(config.max_results, 20);
        assert!(config.enrich);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(PipelineConfig::from_yaml("max_results: [oops").is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = PipelineConfig::default();
        let cli = Cli::parse_from([
            "grounded_news",
            "KT",
            "--market",
            "ja-JP",
            "--max-results",
            "7",
            "--site",
            "nikkei.com",
            "--no-enrich",
        ]);
        config.apply_cli(&cli).unwrap();
        assert_eq!(config.market, "ja-JP");
        assert_eq!(config.max_results, 7);
        assert_eq!(config.site_filters, vec!["nikkei.com"]);
        assert!(!config.enrich);
    }

    #[test]
    fn test_load_site_filters_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# preset\nzdnet.co.kr\n\n  etnews.com  \n").unwrap();
        let sites = load_site_filters(file.path()).unwrap();
        assert_eq!(sites, vec!["zdnet.co.kr", "etnews.com"]);
    }

    #[test]
    fn test_search_options_from_config() {
        let config = PipelineConfig {
            site_filters: vec!["www.etnews.com".to_string()],
            ..PipelineConfig::default()
        };
        let options = config.search_options().unwrap();
        assert_eq!(options.site_filters, vec!["etnews.com"]);
        assert_eq!(options.max_results, 20);

        let config = PipelineConfig {
            max_results: 0,
            ..PipelineConfig::default()
        };
        assert!(config.search_options().is_err());
    }
}
