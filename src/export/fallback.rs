//! Fallback persistence
//!
//! When the remote path fails partway through, the snapshot is written to
//! durable local storage under the same filename the remote attempt used.
//! The artifact is retained deliberately: once the relay path has failed it
//! is the only copy of the data.

use std::path::{Path, PathBuf};

use super::types::{ExportSnapshot, LocalFallbackRecord};

pub struct FallbackPersister {
    dir: PathBuf,
}

impl FallbackPersister {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Deterministic destination for a given export filename
    pub fn target_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Write the full snapshot to the fallback directory
    pub async fn persist(
        &self,
        snapshot: &ExportSnapshot,
        filename: &str,
    ) -> std::io::Result<LocalFallbackRecord> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.target_path(filename);
        tokio::fs::write(&path, &snapshot.bytes).await?;

        tracing::warn!(
            path = %path.display(),
            size = snapshot.size(),
            "Export persisted to local fallback"
        );

        Ok(LocalFallbackRecord {
            path,
            size: snapshot.size(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::make_snapshot;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_persisted_file_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let persister = FallbackPersister::new(dir.path().to_path_buf());
        let snapshot = make_snapshot((0..200u8).collect(), 5);

        let record = persister.persist(&snapshot, "export.json").await.unwrap();

        assert_eq!(record.size, snapshot.size());
        let written = tokio::fs::read(&record.path).await.unwrap();
        assert_eq!(written, snapshot.bytes);
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let persister = FallbackPersister::new(nested.clone());
        let snapshot = make_snapshot(vec![9u8; 10], 1);

        let record = persister.persist(&snapshot, "export.json").await.unwrap();

        assert_eq!(record.path, nested.join("export.json"));
        assert!(record.path.exists());
    }

    #[tokio::test]
    async fn test_path_correlates_with_filename() {
        let persister = FallbackPersister::new(PathBuf::from("/var/exports"));
        assert_eq!(
            persister.target_path("archivo_export_x.json"),
            PathBuf::from("/var/exports/archivo_export_x.json")
        );
    }
}
