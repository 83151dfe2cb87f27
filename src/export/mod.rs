//! Export pipeline module
//!
//! Ships the full user registry to the relay backend as one file, in
//! bounded-size parts:
//!
//! 1. A snapshot of the registry is produced in memory
//! 2. The snapshot is sliced into ordered parts and uploaded sequentially
//!    under one random transfer id, with bounded per-part retries
//! 3. A single commit binds the acknowledged parts into one remote file,
//!    delivered with a summary caption
//! 4. If upload or commit fails, the snapshot is persisted to local disk
//!    instead and a degraded-mode report is pushed
//!
//! One invocation at a time; a concurrent trigger fails fast with `Busy`.

pub mod assembler;
pub mod cancel;
pub mod chunker;
pub mod fallback;
pub mod pipeline;
pub mod snapshot;
pub mod transfer_id;
pub mod types;
pub mod uploader;

#[cfg(test)]
pub(crate) mod test_support;

pub use assembler::TransferAssembler;
pub use cancel::{CancelHandle, CancelReason, CancelToken};
pub use chunker::{Part, PartReader};
pub use fallback::FallbackPersister;
pub use pipeline::ExportPipeline;
pub use snapshot::{export_filename, ExportDocument, RegistrySnapshotSource, SnapshotSource};
pub use transfer_id::{OsRngIds, TransferIdSource};
pub use types::*;
pub use uploader::ChunkedUploadCoordinator;
