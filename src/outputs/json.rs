//! JSON output of a collection.
//!
//! Files are grouped by the collection date (in the collection's window
//! offset) and named after the keyword slug:
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     └── kt.json
//! ```

use crate::models::Collection;
use crate::utils::slugify_title;
use chrono::FixedOffset;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `collection` as pretty-printed JSON.
///
/// # Returns
///
/// The path of the written file.
///
/// # Output Path
///
/// `{json_output_dir}/{date}/{keyword-slug}.json`
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_collection(
    collection: &Collection,
    json_output_dir: &str,
    offset: FixedOffset,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(collection)?;

    let local_date = collection.collected_at.with_timezone(&offset).date_naive();
    let full_json_dir = PathBuf::from(json_output_dir).join(local_date.to_string());

    info!(full_json_dir = %full_json_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(full_json_dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let output_json_filename = full_json_dir.join(format!("{}.json", file_stem(&collection.keyword)));
    fs::write(&output_json_filename, json).await?;
    info!(path = %output_json_filename.display(), articles = collection.articles.len(), "Wrote JSON file");

    Ok(output_json_filename)
}

/// Slug used for file names; never empty.
pub fn file_stem(keyword: &str) -> String {
    let slug = slugify_title(keyword);
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "news".to_string()
    } else {
        slug.to_string()
    }
}
