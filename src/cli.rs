//! Command-line interface definitions.
//!
//! Most options can also be provided via environment variables. Values given
//! here override the YAML configuration file.

use crate::models::Freshness;
use clap::Parser;
use std::path::PathBuf;

/// Collect deduplicated news articles for a keyword.
///
/// # Examples
///
/// ```sh
/// # Search the preset sites, then relax to an open search
/// grounded_news KT --sites-file presets/kr_it.txt -j ./json -m ./markdown
///
/// # One-off search with inline filters and a hard deadline
/// grounded_news "KT cloud" --site zdnet.co.kr --site etnews.com --deadline-secs 300
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Keyword or query to search for
    pub keyword: String,

    /// Path to the pipeline config.yaml
    #[arg(short, long, env = "GROUNDED_NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Search recency
    #[arg(short, long, value_enum)]
    pub freshness: Option<Freshness>,

    /// Market/language code, e.g. ko-KR
    #[arg(long)]
    pub market: Option<String>,

    /// Maximum number of unique articles to collect (capped at 50)
    #[arg(short = 'n', long)]
    pub max_results: Option<usize>,

    /// Restrict the first passes to this domain (repeatable)
    #[arg(long)]
    pub site: Vec<String>,

    /// File with one domain per line
    #[arg(long)]
    pub sites_file: Option<PathBuf>,

    /// Skip per-article summarization and sentiment
    #[arg(long)]
    pub no_enrich: bool,

    /// Stop collecting after this many seconds and keep partial results
    #[arg(long, env = "GROUNDED_NEWS_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,

    /// Output directory for the JSON file
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Output directory for the Markdown report
    #[arg(short, long)]
    pub markdown_output_dir: Option<String>,

    /// Output directory for the CSV export
    #[arg(long)]
    pub csv_output_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "grounded_news",
            "KT",
            "--json-output-dir",
            "./json",
            "--markdown-output-dir",
            "./markdown",
        ]);

        assert_eq!(cli.keyword, "KT");
        assert_eq!(cli.json_output_dir.as_deref(), Some("./json"));
        assert_eq!(cli.markdown_output_dir.as_deref(), Some("./markdown"));
        assert!(cli.site.is_empty());
        assert!(!cli.no_enrich);
        assert!(cli.csv_output_dir.is_none());
    }

    #[test]
    fn test_cli_short_flags_and_repeats() {
        let cli = Cli::parse_from([
            "grounded_news",
            "KT cloud",
            "-f",
            "month",
            "-n",
            "15",
            "--site",
            "zdnet.co.kr",
            "--site",
            "etnews.com",
            "-j",
            "/tmp/json",
        ]);

        assert_eq!(cli.keyword, "KT cloud");
        assert_eq!(cli.freshness, Some(Freshness::Month));
        assert_eq!(cli.max_results, Some(15));
        assert_eq!(cli.site, vec!["zdnet.co.kr", "etnews.com"]);
        assert_eq!(cli.json_output_dir.as_deref(), Some("/tmp/json"));
    }

    #[test]
    fn test_cli_csv_output_dir() {
        let cli = Cli::parse_from(["grounded_news", "KT", "-j", "./json", "--csv-output-dir", "./csv"]);
        assert_eq!(cli.csv_output_dir.as_deref(), Some("./csv"));
        assert_eq!(cli.json_output_dir.as_deref(), Some("./json"));
    }

    #[test]
    fn test_cli_requires_keyword() {
        assert!(Cli::try_parse_from(["grounded_news"]).is_err());
    }
}
