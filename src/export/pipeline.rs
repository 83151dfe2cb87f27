//! Export pipeline
//!
//! One invocation runs the machine
//! `Idle → Uploading → Committing → Done`, degrading to `FallbackSaved`
//! when the remote path fails partway through, or ending in `FatalFailed`
//! when even the fallback write is impossible. No state is ever re-entered.
//!
//! Only one invocation may be active at a time: a single session slot is
//! taken before uploading begins and released on every exit path. A second
//! concurrent trigger fails fast with `Busy` instead of queueing — two
//! sessions would otherwise race for the same fallback filename.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::relay::RelayTransport;

use super::assembler::TransferAssembler;
use super::cancel::CancelToken;
use super::fallback::FallbackPersister;
use super::snapshot::{export_filename, SnapshotSource};
use super::transfer_id::TransferIdSource;
use super::types::{
    DeliveredSummary, ExportError, ExportReport, ExportSnapshot, FallbackSummary, TransferSession,
    EXPORT_MIME_TYPE,
};
use super::uploader::ChunkedUploadCoordinator;

pub struct ExportPipeline {
    transport: Arc<dyn RelayTransport>,
    source: Arc<dyn SnapshotSource>,
    ids: Arc<dyn TransferIdSource>,
    persister: FallbackPersister,
    chunk_size: usize,
    staging_dir: PathBuf,
    slot: Semaphore,
}

impl ExportPipeline {
    pub fn new(
        transport: Arc<dyn RelayTransport>,
        source: Arc<dyn SnapshotSource>,
        ids: Arc<dyn TransferIdSource>,
        config: &ExportConfig,
    ) -> Self {
        Self {
            transport,
            source,
            ids,
            persister: FallbackPersister::new(config.fallback_dir.clone()),
            chunk_size: config.chunk_size,
            staging_dir: std::env::temp_dir(),
            slot: Semaphore::new(1),
        }
    }

    /// Override where the transient staging copy is written
    pub fn with_staging_dir(mut self, dir: PathBuf) -> Self {
        self.staging_dir = dir;
        self
    }

    /// Run one full export. The snapshot is produced, shipped through the
    /// relay, and on a session failure persisted locally instead.
    pub async fn run(&self, mut cancel: CancelToken) -> Result<ExportReport, ExportError> {
        let _slot = self.slot.try_acquire().map_err(|_| ExportError::Busy)?;

        let job_id = Uuid::new_v4();
        tracing::info!(job_id = %job_id, "Export started");

        let snapshot = self.source.produce().await?;
        let filename = export_filename(&snapshot.generated_at);

        match self.ship(&snapshot, &filename, &mut cancel).await {
            Ok(summary) => {
                tracing::info!(
                    job_id = %job_id,
                    part_count = summary.part_count,
                    size = summary.size,
                    "Export delivered"
                );
                Ok(ExportReport::Delivered(summary))
            }
            Err(err) if err.triggers_fallback() => self.degrade(&snapshot, &filename, err, job_id).await,
            Err(err) => {
                tracing::warn!(job_id = %job_id, error = %err, "Export failed");
                Err(err)
            }
        }
    }

    /// Uploading and Committing stages
    async fn ship(
        &self,
        snapshot: &ExportSnapshot,
        filename: &str,
        cancel: &mut CancelToken,
    ) -> Result<DeliveredSummary, ExportError> {
        let mut session = TransferSession::new(
            self.ids.next_id(),
            self.chunk_size,
            filename.to_string(),
            EXPORT_MIME_TYPE.to_string(),
        );

        tracing::info!(
            state = "uploading",
            transfer_id = session.transfer_id,
            size = snapshot.size(),
            chunk_size = self.chunk_size,
            "Upload session opened"
        );

        let staging_name = format!("{}_{}", session.transfer_id, filename);
        let staging =
            StagingCopy::create(&self.staging_dir, &staging_name, &snapshot.bytes).await?;
        let file = staging.open().await?;

        let reference = ChunkedUploadCoordinator::new()
            .run(self.transport.as_ref(), &mut session, file, cancel)
            .await?;

        // Every byte of the snapshot must be covered before commit.
        if session.uploaded_size() != snapshot.size() {
            return Err(ExportError::Staging(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "uploaded {} bytes, snapshot has {}",
                    session.uploaded_size(),
                    snapshot.size()
                ),
            )));
        }

        tracing::info!(
            state = "committing",
            transfer_id = reference.transfer_id,
            part_count = reference.part_count,
            "All parts acknowledged"
        );

        let summary =
            TransferAssembler::commit(self.transport.as_ref(), &reference, snapshot, cancel)
                .await?;

        // The remote side is authoritative now; the staging copy goes away.
        staging.remove().await;

        Ok(summary)
    }

    /// FallbackSaved stage. A persistence failure here is fatal and carries
    /// the original session failure with it.
    async fn degrade(
        &self,
        snapshot: &ExportSnapshot,
        filename: &str,
        cause: ExportError,
        job_id: Uuid,
    ) -> Result<ExportReport, ExportError> {
        tracing::warn!(
            state = "fallback",
            job_id = %job_id,
            error = %cause,
            "Remote path failed, persisting local copy"
        );

        let path = self.persister.target_path(filename);
        let record = match self.persister.persist(snapshot, filename).await {
            Ok(record) => record,
            Err(source) => {
                return Err(ExportError::PersistFailed {
                    path,
                    source,
                    cause: Box::new(cause),
                });
            }
        };

        let summary = FallbackSummary {
            record_count: snapshot.record_count,
            generated_at: snapshot.generated_at,
            size: record.size,
            path: record.path.display().to_string(),
            cause: cause.to_string(),
        };

        // The degraded report is best-effort: the fallback copy already
        // holds the data, so a relay failure here is only logged.
        if let Err(e) = self.transport.send_text(&degraded_report(&summary)).await {
            tracing::warn!(job_id = %job_id, error = %e, "Could not deliver degraded-mode report");
        }

        Ok(ExportReport::FallbackSaved(summary))
    }
}

/// Status line pushed over the transport when an export degrades
fn degraded_report(summary: &FallbackSummary) -> String {
    format!(
        "Registry export degraded\n\
         Total users: {}\n\
         Exported at: {}\n\
         Saved locally to: {}\n\
         Reason: {}",
        summary.record_count,
        summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        summary.path,
        summary.cause,
    )
}

/// Transient on-disk copy the upload streams from. Removed explicitly after
/// a successful commit; the drop guard covers every other exit path.
struct StagingCopy {
    path: PathBuf,
    removed: bool,
}

impl StagingCopy {
    async fn create(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await?;

        Ok(Self {
            path,
            removed: false,
        })
    }

    async fn open(&self) -> std::io::Result<tokio::fs::File> {
        tokio::fs::File::open(&self.path).await
    }

    async fn remove(mut self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Could not remove staging copy");
        }
        self.removed = true;
    }
}

impl Drop for StagingCopy {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
