//! Chunked upload coordination
//!
//! Drives one transfer session: slices the byte source into parts and
//! uploads them sequentially under the session's transfer id. A failed part
//! is retried in place with the same id and index; once the retry budget is
//! exhausted the whole session aborts and no commit is attempted. Parts the
//! relay already accepted are left orphaned — the backend has no
//! partial-transfer cleanup operation.

use tokio::io::AsyncRead;

use crate::relay::{RelayError, RelayTransport};

use super::cancel::CancelToken;
use super::chunker::{Part, PartReader};
use super::types::{ExportError, RemoteFileReference, TransferSession, PART_RETRY_ATTEMPTS};

/// Uploads every part of one session, in order
pub struct ChunkedUploadCoordinator {
    retry_attempts: u32,
}

impl ChunkedUploadCoordinator {
    pub fn new() -> Self {
        Self {
            retry_attempts: PART_RETRY_ATTEMPTS,
        }
    }

    /// Run the session to completion against `transport`, reading parts
    /// from `source`. The part count is finalized only after the source is
    /// exhausted.
    pub async fn run<R: AsyncRead + Unpin>(
        &self,
        transport: &dyn RelayTransport,
        session: &mut TransferSession,
        source: R,
        cancel: &mut CancelToken,
    ) -> Result<RemoteFileReference, ExportError> {
        let mut reader = PartReader::new(source, session.chunk_size);
        let mut offset: u64 = 0;

        while let Some(part) = reader.next_part().await? {
            let end = offset + part.bytes.len() as u64;
            session.begin_part(part.index, offset, end);

            self.upload_part(transport, session.transfer_id, &part, cancel)
                .await?;

            session.acknowledge_part(part.index);
            offset = end;

            tracing::debug!(
                transfer_id = session.transfer_id,
                part_index = part.index,
                part_size = part.bytes.len(),
                uploaded = offset,
                "Part acknowledged"
            );
        }

        session.reference().ok_or_else(|| {
            ExportError::Staging(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "byte source produced no parts",
            ))
        })
    }

    /// Upload one part, retrying in place within the budget. Negative
    /// acknowledgements and transport errors both consume an attempt.
    async fn upload_part(
        &self,
        transport: &dyn RelayTransport,
        transfer_id: i64,
        part: &Part,
        cancel: &mut CancelToken,
    ) -> Result<(), ExportError> {
        let mut last_error: Option<RelayError> = None;

        for attempt in 1..=self.retry_attempts {
            if let Some(reason) = cancel.reason() {
                return Err(reason.into_error("uploading"));
            }

            let result = tokio::select! {
                biased;
                reason = cancel.cancelled() => return Err(reason.into_error("uploading")),
                result = transport.upload_part(transfer_id, part.index, &part.bytes) => result,
            };

            match result {
                Ok(true) => {
                    if attempt > 1 {
                        tracing::info!(
                            transfer_id = transfer_id,
                            part_index = part.index,
                            attempt = attempt,
                            "Part accepted after retry"
                        );
                    }
                    return Ok(());
                }
                Ok(false) => {
                    tracing::warn!(
                        transfer_id = transfer_id,
                        part_index = part.index,
                        attempt = attempt,
                        "Relay rejected part"
                    );
                    last_error = Some(RelayError::Rejected {
                        transfer_id,
                        index: part.index,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        transfer_id = transfer_id,
                        part_index = part.index,
                        attempt = attempt,
                        error = %e,
                        "Part upload failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(ExportError::UploadFailed {
            index: part.index,
            attempts: self.retry_attempts,
            source: last_error.unwrap_or(RelayError::Rejected {
                transfer_id,
                index: part.index,
            }),
        })
    }
}

impl Default for ChunkedUploadCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
