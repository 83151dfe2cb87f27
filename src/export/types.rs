//! Export pipeline types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::relay::RelayError;

// ============================================================================
// Constants
// ============================================================================

/// Default part size: 512KB
pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;

/// Attempts per part before the session is abandoned
pub const PART_RETRY_ATTEMPTS: u32 = 3;

/// MIME type of the export document
pub const EXPORT_MIME_TYPE: &str = "application/json";

// ============================================================================
// Snapshot
// ============================================================================

/// The full export payload, produced before any upload begins.
///
/// Immutable once produced; owned exclusively by the pipeline invocation
/// that created it and dropped when the invocation ends.
#[derive(Debug, Clone)]
pub struct ExportSnapshot {
    /// Serialized export document
    pub bytes: Vec<u8>,

    /// Generation timestamp
    pub generated_at: DateTime<Utc>,

    /// Rows in the export document
    pub record_count: u64,

    /// SHA-256 of `bytes`, hex-encoded
    pub digest: String,
}

impl ExportSnapshot {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

// ============================================================================
// Transfer Session
// ============================================================================

/// One bounded-size contiguous slice of the snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub index: u32,

    /// Byte range [start, end) within the snapshot
    pub start: u64,
    pub end: u64,

    pub acknowledged: bool,
}

impl UploadedPart {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// State of one upload attempt. Created when the attempt starts, dropped
/// when the pipeline invocation ends; the transfer id is never reused.
#[derive(Debug)]
pub struct TransferSession {
    /// Random non-negative id correlating all parts and the final commit
    pub transfer_id: i64,

    /// Maximum bytes per part
    pub chunk_size: usize,

    /// Parts in upload order
    pub parts: Vec<UploadedPart>,

    pub filename: String,
    pub mime_type: String,
}

impl TransferSession {
    pub fn new(transfer_id: i64, chunk_size: usize, filename: String, mime_type: String) -> Self {
        debug_assert!(transfer_id >= 0);
        debug_assert!(chunk_size > 0);

        Self {
            transfer_id,
            chunk_size,
            parts: Vec::new(),
            filename,
            mime_type,
        }
    }

    /// Record a part that is about to be uploaded. Parts arrive strictly in
    /// increasing index order, covering consecutive byte ranges.
    pub fn begin_part(&mut self, index: u32, start: u64, end: u64) {
        debug_assert_eq!(index as usize, self.parts.len());
        debug_assert_eq!(start, self.parts.last().map(|p| p.end).unwrap_or(0));

        self.parts.push(UploadedPart {
            index,
            start,
            end,
            acknowledged: false,
        });
    }

    /// Mark a part as acknowledged by the relay
    pub fn acknowledge_part(&mut self, index: u32) {
        if let Some(part) = self.parts.get_mut(index as usize) {
            part.acknowledged = true;
        }
    }

    pub fn all_acknowledged(&self) -> bool {
        self.parts.iter().all(|p| p.acknowledged)
    }

    /// Sum of all recorded part lengths
    pub fn uploaded_size(&self) -> u64 {
        self.parts.iter().map(|p| p.len()).sum()
    }

    pub fn part_count(&self) -> u32 {
        self.parts.len() as u32
    }

    /// Build the remote file reference. Only available once every part has
    /// been acknowledged; the reference is consumed exactly once by commit.
    pub fn reference(&self) -> Option<RemoteFileReference> {
        if self.parts.is_empty() || !self.all_acknowledged() {
            return None;
        }

        Some(RemoteFileReference {
            transfer_id: self.transfer_id,
            part_count: self.part_count(),
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
        })
    }
}

/// Handle to the committed-to-be remote file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileReference {
    pub transfer_id: i64,
    pub part_count: u32,
    pub filename: String,
    pub mime_type: String,
}

/// Where a fallback copy landed. The artifact is retained: it is the only
/// copy of the data once the remote path has failed.
#[derive(Debug, Clone)]
pub struct LocalFallbackRecord {
    pub path: PathBuf,
    pub size: u64,
}

// ============================================================================
// Reports
// ============================================================================

/// Success summary: the data left the process
#[derive(Debug, Clone, Serialize)]
pub struct DeliveredSummary {
    pub record_count: u64,
    pub generated_at: DateTime<Utc>,
    pub size: u64,
    pub part_count: u32,
    pub filename: String,
}

/// Degraded-mode summary: the data is on local disk only
#[derive(Debug, Clone, Serialize)]
pub struct FallbackSummary {
    pub record_count: u64,
    pub generated_at: DateTime<Utc>,
    pub size: u64,
    pub path: String,
    pub cause: String,
}

/// Outcome of one pipeline invocation
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportReport {
    Delivered(DeliveredSummary),
    FallbackSaved(FallbackSummary),
}

// ============================================================================
// Error Types
// ============================================================================

/// Snapshot producer failure. Fatal: there is nothing valid to persist, so
/// no upload and no fallback write is attempted.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SnapshotError(pub String);

/// Export pipeline error types
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Snapshot generation failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Upload of part {index} failed after {attempts} attempts: {source}")]
    UploadFailed {
        index: u32,
        attempts: u32,
        #[source]
        source: RelayError,
    },

    #[error("Commit of transfer {transfer_id} failed: {source}")]
    CommitFailed {
        transfer_id: i64,
        #[source]
        source: RelayError,
    },

    #[error("Staging failed: {0}")]
    Staging(#[from] std::io::Error),

    #[error("Deadline elapsed while {stage}")]
    DeadlineExceeded { stage: &'static str },

    #[error("Fallback write to {} failed: {source} (original failure: {cause})", path.display())]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        cause: Box<ExportError>,
    },

    #[error("An export is already in progress")]
    Busy,

    #[error("Export cancelled by caller")]
    Cancelled,
}

impl ExportError {
    /// Session failures degrade to local persistence; everything else is
    /// terminal as-is.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            Self::UploadFailed { .. }
                | Self::CommitFailed { .. }
                | Self::Staging(_)
                | Self::DeadlineExceeded { .. }
        )
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Snapshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UploadFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::CommitFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::Staging(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::PersistFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Busy => StatusCode::CONFLICT,
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Stable machine-readable code for responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot_failed",
            Self::UploadFailed { .. } => "upload_failed",
            Self::CommitFailed { .. } => "commit_failed",
            Self::Staging(_) => "staging_failed",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::PersistFailed { .. } => "persist_failed",
            Self::Busy => "busy",
            Self::Cancelled => "cancelled",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
