//! Shared test doubles for the export pipeline

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::relay::{RelayError, RelayTransport};

use super::snapshot::SnapshotSource;
use super::transfer_id::TransferIdSource;
use super::types::{ExportSnapshot, SnapshotError};

/// One observed transport call
#[derive(Debug, Clone, PartialEq)]
pub enum RelayCall {
    Part {
        transfer_id: i64,
        index: u32,
        len: usize,
    },
    Commit {
        transfer_id: i64,
        part_count: u32,
        filename: String,
    },
    Text(String),
}

/// Scriptable in-memory relay. Records every call; failures are budgets per
/// part index (`u32::MAX` means permanent).
#[derive(Default)]
pub struct ScriptedRelay {
    calls: Mutex<Vec<RelayCall>>,
    part_errors: Mutex<HashMap<u32, u32>>,
    part_rejections: Mutex<HashMap<u32, u32>>,
    fail_commit: bool,
    fail_send_text: bool,
    part_delay: Option<Duration>,
    received: Mutex<Vec<u8>>,
}

impl ScriptedRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `failures` upload attempts of part `index` with a transport error
    pub fn failing_part(self, index: u32, failures: u32) -> Self {
        self.part_errors.lock().unwrap().insert(index, failures);
        self
    }

    /// Answer `rejections` upload attempts of part `index` with a negative ack
    pub fn rejecting_part(self, index: u32, rejections: u32) -> Self {
        self.part_rejections.lock().unwrap().insert(index, rejections);
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn failing_send_text(mut self) -> Self {
        self.fail_send_text = true;
        self
    }

    /// Delay every part upload, to hold a session open in concurrency tests
    pub fn with_part_delay(mut self, delay: Duration) -> Self {
        self.part_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RelayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn committed(&self) -> bool {
        self.calls()
            .iter()
            .any(|c| matches!(c, RelayCall::Commit { .. }))
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RelayCall::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Accepted part payloads, concatenated in upload order
    pub fn received_bytes(&self) -> Vec<u8> {
        self.received.lock().unwrap().clone()
    }

    fn take_budgeted(map: &Mutex<HashMap<u32, u32>>, index: u32) -> bool {
        let mut map = map.lock().unwrap();
        match map.get_mut(&index) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl RelayTransport for ScriptedRelay {
    async fn upload_part(
        &self,
        transfer_id: i64,
        index: u32,
        bytes: &[u8],
    ) -> Result<bool, RelayError> {
        if let Some(delay) = self.part_delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().unwrap().push(RelayCall::Part {
            transfer_id,
            index,
            len: bytes.len(),
        });

        if Self::take_budgeted(&self.part_errors, index) {
            return Err(RelayError::Api {
                status: 503,
                message: "scripted failure".to_string(),
            });
        }

        if Self::take_budgeted(&self.part_rejections, index) {
            return Ok(false);
        }

        self.received.lock().unwrap().extend_from_slice(bytes);
        Ok(true)
    }

    async fn commit(
        &self,
        transfer_id: i64,
        part_count: u32,
        filename: &str,
        _mime_type: &str,
        _caption: &str,
    ) -> Result<(), RelayError> {
        self.calls.lock().unwrap().push(RelayCall::Commit {
            transfer_id,
            part_count,
            filename: filename.to_string(),
        });

        if self.fail_commit {
            return Err(RelayError::Api {
                status: 500,
                message: "scripted commit failure".to_string(),
            });
        }

        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), RelayError> {
        self.calls
            .lock()
            .unwrap()
            .push(RelayCall::Text(text.to_string()));

        if self.fail_send_text {
            return Err(RelayError::Api {
                status: 500,
                message: "scripted send failure".to_string(),
            });
        }

        Ok(())
    }
}

/// Build a snapshot over fixed bytes
pub fn make_snapshot(bytes: Vec<u8>, record_count: u64) -> ExportSnapshot {
    let digest = hex::encode(Sha256::digest(&bytes));
    ExportSnapshot {
        bytes,
        generated_at: fixed_timestamp(),
        record_count,
        digest,
    }
}

pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T12:30:45Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Snapshot source returning a pre-built snapshot
pub struct FixedSnapshotSource {
    snapshot: ExportSnapshot,
}

impl FixedSnapshotSource {
    pub fn new(snapshot: ExportSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl SnapshotSource for FixedSnapshotSource {
    async fn produce(&self) -> Result<ExportSnapshot, SnapshotError> {
        Ok(self.snapshot.clone())
    }
}

/// Snapshot source that always fails
pub struct FailingSnapshotSource;

#[async_trait]
impl SnapshotSource for FailingSnapshotSource {
    async fn produce(&self) -> Result<ExportSnapshot, SnapshotError> {
        Err(SnapshotError("scripted snapshot failure".to_string()))
    }
}

/// Deterministic transfer ids for tests
pub struct FixedIds(pub i64);

impl TransferIdSource for FixedIds {
    fn next_id(&self) -> i64 {
        self.0
    }
}
