//! Relay transport trait

use async_trait::async_trait;

use super::types::RelayError;

/// Trait for relay transport backends
///
/// One logical file is shipped as a sequence of `upload_part` calls under a
/// single transfer id, finalized by exactly one `commit`. The transport does
/// not offer partial-transfer cleanup: parts of an abandoned transfer are
/// left orphaned on the relay side.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Upload one part of a transfer. Returns whether the relay acknowledged
    /// the part; `Ok(false)` is a negative acknowledgement, not an error.
    async fn upload_part(
        &self,
        transfer_id: i64,
        index: u32,
        bytes: &[u8],
    ) -> Result<bool, RelayError>;

    /// Bind all uploaded parts into one addressable remote file and deliver
    /// it with a caption.
    async fn commit(
        &self,
        transfer_id: i64,
        part_count: u32,
        filename: &str,
        mime_type: &str,
        caption: &str,
    ) -> Result<(), RelayError>;

    /// Push a plain status line to the destination.
    async fn send_text(&self, text: &str) -> Result<(), RelayError>;
}
