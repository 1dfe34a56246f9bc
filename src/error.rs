//! Error taxonomy for the retrieval pipeline.
//!
//! Only [`PipelineError::InvalidConfig`] ever escapes a collection run. The
//! other variants are downgraded to soft failures and carried in the
//! [`Collection`](crate::models::Collection) metadata.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PipelineError {
    /// Rejected before any collaborator call.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The agent's text could not be turned into a JSON array.
    #[error("malformed agent response: {preview}")]
    MalformedResponse { preview: String },

    /// The search collaborator itself failed (network, auth, quota, timeout).
    #[error("search tool failure: {0}")]
    ToolFailure(String),

    /// Summarization/sentiment for one article failed.
    #[error("enrichment failure: {0}")]
    EnrichmentFailure(String),
}
