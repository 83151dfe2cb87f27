//! Relay wire types

use serde::{Deserialize, Serialize};

/// Relay error types
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Relay request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Relay returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Relay did not accept part {index} of transfer {transfer_id}")]
    Rejected { transfer_id: i64, index: u32 },
}

/// Body for a part upload
#[derive(Debug, Serialize)]
pub struct PartUploadRequest {
    /// Part payload, base64-encoded
    pub bytes: String,
}

/// Response to a part upload
#[derive(Debug, Deserialize)]
pub struct PartUploadResponse {
    /// Whether the relay accepted and stored the part
    pub accepted: bool,
}

/// Body for the commit call
#[derive(Debug, Serialize)]
pub struct CommitRequest {
    pub part_count: u32,
    pub filename: String,
    pub mime_type: String,
    pub caption: String,
}

/// Body for a text line
#[derive(Debug, Serialize)]
pub struct TextRequest {
    pub text: String,
}
