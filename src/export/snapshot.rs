//! Snapshot production
//!
//! Serializes the user registry into the export document. The snapshot is
//! produced in full before any upload begins; a producer failure aborts the
//! pipeline with nothing to persist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::db::{UserRecord, UserRepository};

use super::types::{ExportSnapshot, SnapshotError};

/// The JSON document shipped to the relay
#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub generated_at: DateTime<Utc>,
    pub total_users: u64,
    pub users: Vec<UserRecord>,
}

/// Trait for snapshot producers
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn produce(&self) -> Result<ExportSnapshot, SnapshotError>;
}

/// Snapshot source backed by the user registry
pub struct RegistrySnapshotSource {
    pool: SqlitePool,
}

impl RegistrySnapshotSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotSource for RegistrySnapshotSource {
    async fn produce(&self) -> Result<ExportSnapshot, SnapshotError> {
        let repo = UserRepository::new(&self.pool);
        let users = repo
            .list_all()
            .await
            .map_err(|e| SnapshotError(e.to_string()))?;

        let generated_at = Utc::now();
        let document = ExportDocument {
            generated_at,
            total_users: users.len() as u64,
            users,
        };

        let bytes =
            serde_json::to_vec_pretty(&document).map_err(|e| SnapshotError(e.to_string()))?;
        let digest = hex::encode(Sha256::digest(&bytes));

        tracing::info!(
            record_count = document.total_users,
            size = bytes.len(),
            "Export snapshot generated"
        );

        Ok(ExportSnapshot {
            record_count: document.total_users,
            bytes,
            generated_at,
            digest,
        })
    }
}

/// Filename shared by the remote attempt and any fallback copy, so
/// operators can correlate the two.
pub fn export_filename(generated_at: &DateTime<Utc>) -> String {
    format!(
        "archivo_export_{}.json",
        generated_at.format("%Y-%m-%d_%H-%M-%S")
    )
}
