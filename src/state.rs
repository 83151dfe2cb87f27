//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::export::{ExportPipeline, OsRngIds, RegistrySnapshotSource};
use crate::relay::RelayTransport;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    relay: Arc<dyn RelayTransport>,
    export: ExportPipeline,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, relay: Arc<dyn RelayTransport>, db: SqlitePool) -> Self {
        let export = ExportPipeline::new(
            relay.clone(),
            Arc::new(RegistrySnapshotSource::new(db.clone())),
            Arc::new(OsRngIds),
            &config.export,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                relay,
                export,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the relay transport
    pub fn relay(&self) -> &dyn RelayTransport {
        self.inner.relay.as_ref()
    }

    /// Get the export pipeline
    pub fn export_pipeline(&self) -> &ExportPipeline {
        &self.inner.export
    }
}
