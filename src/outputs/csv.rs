//! Tabular export of a collection, one row per article.
//!
//! ```text
//! csv_output_dir/
//! └── 2025-05-06/
//!     └── kt.csv
//! ```
//!
//! Timestamps are written as RFC 3339 in the collection's window offset.
//! Missing values are empty cells.

use crate::models::{Article, Collection, Sentiment};
use crate::outputs::json::file_stem;
use ::csv::WriterBuilder;
use chrono::FixedOffset;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Header row, in column order.
pub const COLUMNS: [&str; 7] = [
    "title",
    "snippet",
    "source_name",
    "published_at",
    "url",
    "sentiment",
    "summary",
];

#[derive(Debug, Serialize)]
struct Row<'a> {
    title: &'a str,
    snippet: &'a str,
    source_name: &'a str,
    published_at: Option<String>,
    url: Option<&'a str>,
    sentiment: Option<Sentiment>,
    summary: Option<&'a str>,
}

impl<'a> Row<'a> {
    fn new(article: &'a Article, offset: FixedOffset) -> Self {
        Self {
            title: &article.title,
            snippet: &article.snippet,
            source_name: &article.source_name,
            published_at: article
                .published_at
                .map(|at| at.with_timezone(&offset).to_rfc3339()),
            url: article.url.as_deref(),
            sentiment: article.sentiment,
            summary: article.summary.as_deref(),
        }
    }
}

/// Render the collection's articles as UTF-8 CSV. The header row is always
/// present, even for an empty collection.
pub fn collection_to_csv(collection: &Collection, offset: FixedOffset) -> Result<Vec<u8>, ::csv::Error> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    wtr.write_record(COLUMNS)?;
    for article in &collection.articles {
        wtr.serialize(Row::new(article, offset))?;
    }
    wtr.into_inner().map_err(|e| e.into_error().into())
}

/// Write the CSV export to `{dir}/{date}/{keyword-slug}.csv`.
#[instrument(level = "info", skip_all, fields(csv_output_dir = %csv_output_dir))]
pub async fn write_collection(
    collection: &Collection,
    csv_output_dir: &str,
    offset: FixedOffset,
) -> Result<PathBuf, Box<dyn Error>> {
    let bytes = collection_to_csv(collection, offset)?;

    let local_date = collection.collected_at.with_timezone(&offset).date_naive();
    let full_csv_dir = PathBuf::from(csv_output_dir).join(local_date.to_string());
    if let Err(e) = fs::create_dir_all(&full_csv_dir).await {
        error!(full_csv_dir = %full_csv_dir.display(), error = %e, "Failed to create CSV dir");
        return Err(e.into());
    }

    let path = full_csv_dir.join(format!("{}.csv", file_stem(&collection.keyword)));
    fs::write(&path, bytes).await?;
    info!(path = %path.display(), rows = collection.articles.len(), "Wrote CSV file");
    Ok(path)
}
