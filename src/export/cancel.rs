//! Cancellation signal for the export pipeline
//!
//! A watch channel carrying the cancellation reason. The reason matters:
//! a deadline aborts the session but still degrades to the fallback path,
//! while a caller abort abandons the operation entirely.

use std::time::Duration;
use tokio::sync::watch;

/// Why a run was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller abandoned the operation; no fallback is wanted
    Abort,
    /// The wall-clock budget elapsed; treated like a session failure
    Deadline,
}

impl CancelReason {
    /// Map to the pipeline error for the stage that observed the signal
    pub fn into_error(self, stage: &'static str) -> crate::export::ExportError {
        match self {
            CancelReason::Abort => crate::export::ExportError::Cancelled,
            CancelReason::Deadline => crate::export::ExportError::DeadlineExceeded { stage },
        }
    }
}

/// Sending half of the cancellation signal
pub struct CancelHandle {
    tx: watch::Sender<Option<CancelReason>>,
}

/// Receiving half, owned by one pipeline invocation
pub struct CancelToken {
    rx: watch::Receiver<Option<CancelReason>>,
}

impl CancelHandle {
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(None);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// Abandon the operation entirely
    pub fn abort(&self) {
        let _ = self.tx.send(Some(CancelReason::Abort));
    }

    /// Signal that the time budget elapsed
    pub fn deadline(&self) {
        let _ = self.tx.send(Some(CancelReason::Deadline));
    }

    /// Fire the deadline signal after `budget`. Consumes the handle; the
    /// timer task keeps the channel alive.
    pub fn arm_deadline(self, budget: Duration) {
        tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            self.deadline();
        });
    }
}

impl CancelToken {
    /// A token that never fires, for callers without a cancellation source
    pub fn inert() -> CancelToken {
        let (_, token) = CancelHandle::new();
        token
    }

    /// Current cancellation state, without waiting
    pub fn reason(&self) -> Option<CancelReason> {
        *self.rx.borrow()
    }

    /// Wait until cancelled. Pends forever if the handle is gone without
    /// having fired.
    pub async fn cancelled(&mut self) -> CancelReason {
        loop {
            if let Some(reason) = *self.rx.borrow_and_update() {
                return reason;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
