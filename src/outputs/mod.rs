//! Renderers for a finished [`Collection`](crate::models::Collection).
//!
//! Renderers only ever see the structured collection, never raw agent text.
//!
//! # Submodules
//!
//! - [`csv`]: Exports one row per article for spreadsheets
//! - [`json`]: Writes the collection to a JSON file for downstream tools
//! - [`markdown`]: Converts the collection to a readable Markdown report
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     └── kt-cloud.json
//!
//! csv_output_dir/
//! └── 2025-05-06/
//!     └── kt-cloud.csv
//!
//! markdown_output_dir/
//! └── 2025-05-06_kt-cloud.md
//! ```

pub mod csv;
pub mod json;
pub mod markdown;
