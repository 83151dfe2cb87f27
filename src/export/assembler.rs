//! Transfer assembly
//!
//! Issues the single commit call that binds an acknowledged part sequence
//! into one addressable remote file, delivered with a caption built from
//! the export summary. A failed commit is a session failure: committing
//! again under a fresh transfer id would be a new session, so there is no
//! retry here.

use crate::relay::RelayTransport;

use super::cancel::CancelToken;
use super::types::{DeliveredSummary, ExportError, ExportSnapshot, RemoteFileReference};

pub struct TransferAssembler;

impl TransferAssembler {
    /// Commit a finished session. Called exactly once per reference.
    pub async fn commit(
        transport: &dyn RelayTransport,
        reference: &RemoteFileReference,
        snapshot: &ExportSnapshot,
        cancel: &mut CancelToken,
    ) -> Result<DeliveredSummary, ExportError> {
        if let Some(reason) = cancel.reason() {
            return Err(reason.into_error("committing"));
        }

        let caption = build_caption(snapshot);

        let result = tokio::select! {
            biased;
            reason = cancel.cancelled() => return Err(reason.into_error("committing")),
            result = transport.commit(
                reference.transfer_id,
                reference.part_count,
                &reference.filename,
                &reference.mime_type,
                &caption,
            ) => result,
        };

        result.map_err(|source| ExportError::CommitFailed {
            transfer_id: reference.transfer_id,
            source,
        })?;

        tracing::info!(
            transfer_id = reference.transfer_id,
            part_count = reference.part_count,
            filename = %reference.filename,
            "Transfer committed"
        );

        Ok(DeliveredSummary {
            record_count: snapshot.record_count,
            generated_at: snapshot.generated_at,
            size: snapshot.size(),
            part_count: reference.part_count,
            filename: reference.filename.clone(),
        })
    }
}

/// Caption delivered alongside the committed document
pub fn build_caption(snapshot: &ExportSnapshot) -> String {
    format!(
        "Registry export complete\n\
         Total users: {}\n\
         Exported at: {}\n\
         File size: {:.2} KB\n\
         SHA-256: {}",
        snapshot.record_count,
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        snapshot.size() as f64 / 1024.0,
        snapshot.digest,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{make_snapshot, RelayCall, ScriptedRelay};
    use crate::export::types::EXPORT_MIME_TYPE;

    fn reference() -> RemoteFileReference {
        RemoteFileReference {
            transfer_id: 555,
            part_count: 3,
            filename: "export.json".to_string(),
            mime_type: EXPORT_MIME_TYPE.to_string(),
        }
    }

    #[tokio::test]
    async fn test_commit_called_exactly_once() {
        let relay = ScriptedRelay::new();
        let snapshot = make_snapshot(vec![1u8; 100], 7);
        let mut cancel = CancelToken::inert();

        let summary = TransferAssembler::commit(&relay, &reference(), &snapshot, &mut cancel)
            .await
            .unwrap();

        assert_eq!(summary.part_count, 3);
        assert_eq!(summary.record_count, 7);
        assert_eq!(summary.size, 100);

        let commits: Vec<_> = relay
            .calls()
            .into_iter()
            .filter(|c| matches!(c, RelayCall::Commit { .. }))
            .collect();
        assert_eq!(commits.len(), 1);
        assert!(matches!(
            &commits[0],
            RelayCall::Commit { transfer_id: 555, part_count: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_commit_failure_is_not_retried() {
        let relay = ScriptedRelay::new().failing_commit();
        let snapshot = make_snapshot(vec![2u8; 50], 1);
        let mut cancel = CancelToken::inert();

        let err = TransferAssembler::commit(&relay, &reference(), &snapshot, &mut cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::CommitFailed { transfer_id: 555, .. }));
        let commits = relay
            .calls()
            .iter()
            .filter(|c| matches!(c, RelayCall::Commit { .. }))
            .count();
        assert_eq!(commits, 1);
    }

    #[test]
    fn test_caption_carries_summary_fields() {
        let snapshot = make_snapshot(vec![0u8; 2048], 42);
        let caption = build_caption(&snapshot);

        assert!(caption.contains("Total users: 42"));
        assert!(caption.contains("2.00 KB"));
        assert!(caption.contains(&snapshot.digest));
    }
}
