use std::fs as sync_fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::fs;
use walkdir::WalkDir;

use crate::config::LauncherConfig;
use crate::engine::models::LocalVersionRecord;
use crate::env;
use crate::error::LauncherError;

const VERSION_FILE: &str = "version.json";

#[derive(Clone)]
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    pub fn new() -> Self {
        // Best-effort directory creation; failures are surfaced on write.
        let _ = env::ensure_base_dirs();
        Self {
            base_dir: env::default_app_dir(),
        }
    }

    #[cfg(test)]
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Timestamp of the last installed build, if a valid record exists.
    ///
    /// An unreadable or unparsable record is logged, deleted, and treated
    /// as if nothing was ever installed.
    pub async fn read_local_version(&self) -> Option<DateTime<Utc>> {
        let path = self.version_file_path();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("storage: no local version record at {}", path.display());
                return None;
            }
            Err(err) => {
                warn!("storage: unable to read {}: {err}", path.display());
                return None;
            }
        };

        match serde_json::from_slice::<LocalVersionRecord>(&bytes) {
            Ok(record) => Some(record.local_version),
            Err(err) => {
                warn!(
                    "storage: discarding corrupt version record {}: {err}",
                    path.display()
                );
                let _ = fs::remove_file(&path).await;
                None
            }
        }
    }

    /// Persist the installed build timestamp. Only called after a
    /// successful download-and-extract.
    pub async fn write_local_version(
        &self,
        version: DateTime<Utc>,
    ) -> Result<(), LauncherError> {
        let record = LocalVersionRecord {
            local_version: version,
        };
        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| LauncherError::io(format!("unable to serialize version record: {e}")))?;

        let path = self.version_file_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(format!("unable to create state dir: {e}")))?;
        }
        fs::write(&path, &bytes)
            .await
            .map_err(|e| LauncherError::io(format!("unable to persist version: {e}")))?;
        info!("storage: recorded local version {version}");
        Ok(())
    }

    pub fn version_file_path(&self) -> PathBuf {
        self.base_dir.join(VERSION_FILE)
    }

    pub fn cache_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join("cache").join(filename)
    }

    /// Directory the build archive extracts into for `config.game_dir`.
    pub fn game_path(&self, config: &LauncherConfig) -> PathBuf {
        self.base_dir.join(&config.game_dir)
    }

    pub fn executable_path(&self, config: &LauncherConfig) -> PathBuf {
        self.game_path(config).join(&config.executable)
    }

    pub fn install_root(&self) -> PathBuf {
        self.base_dir.clone()
    }

    /// Remove the installed game, the cached archive, and the version record.
    pub async fn uninstall(&self, config: &LauncherConfig) -> Result<(), LauncherError> {
        let game_dir = self.game_path(config);
        if fs::metadata(&game_dir).await.is_ok() {
            remove_dir_all_force(&game_dir)?;
        }

        let cache_dir = self.base_dir.join("cache");
        if fs::metadata(&cache_dir).await.is_ok() {
            fs::remove_dir_all(&cache_dir)
                .await
                .map_err(|e| LauncherError::io(format!("failed to remove cache: {e}")))?;
        }

        let version_file = self.version_file_path();
        if fs::metadata(&version_file).await.is_ok() {
            fs::remove_file(&version_file)
                .await
                .map_err(|e| LauncherError::io(format!("failed to clear saved version: {e}")))?;
        }

        info!("storage: uninstall completed");
        Ok(())
    }
}

/// Delete a directory tree, clearing read-only attributes first so build
/// outputs marked read-only do not stop the removal. The path itself is
/// removed as well.
pub fn remove_dir_all_force(path: &Path) -> Result<(), LauncherError> {
    debug!("storage: force-removing {}", path.display());
    for entry in WalkDir::new(path).into_iter().flatten() {
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            permissions.set_readonly(false);
            let _ = sync_fs::set_permissions(entry.path(), permissions);
        }
    }
    sync_fs::remove_dir_all(path)
        .map_err(|e| LauncherError::io(format!("failed to remove {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn storage(dir: &tempfile::TempDir) -> StorageManager {
        StorageManager::with_base_dir(dir.path().to_path_buf())
    }

    #[tokio::test]
    async fn round_trips_version_record() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = storage(&dir);
        let version = Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap();

        manager.write_local_version(version).await.expect("write");
        assert_eq!(manager.read_local_version().await, Some(version));
    }

    #[tokio::test]
    async fn missing_record_reads_as_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert_eq!(storage(&dir).read_local_version().await, None);
    }

    #[tokio::test]
    async fn corrupt_record_is_deleted_and_reads_as_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = storage(&dir);
        let path = manager.version_file_path();
        sync_fs::write(&path, b"{ \"localVersion\": \"yesterday-ish\" }").expect("write");

        assert_eq!(manager.read_local_version().await, None);
        assert!(!path.exists(), "corrupt record should be deleted");
    }

    #[tokio::test]
    async fn uninstall_clears_game_cache_and_record() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = storage(&dir);
        let config = LauncherConfig::default();

        let game_dir = manager.game_path(&config);
        sync_fs::create_dir_all(game_dir.join("Data")).expect("game dirs");
        sync_fs::write(game_dir.join("Data").join("level.bin"), b"x").expect("file");
        sync_fs::create_dir_all(manager.cache_path("x").parent().unwrap()).expect("cache dir");
        sync_fs::write(manager.cache_path("boh-build-win.zip"), b"zip").expect("archive");
        manager
            .write_local_version(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap())
            .await
            .expect("record");

        manager.uninstall(&config).await.expect("uninstall");

        assert!(!game_dir.exists());
        assert!(!manager.cache_path("boh-build-win.zip").exists());
        assert!(!manager.version_file_path().exists());
    }

    #[test]
    fn force_remove_handles_read_only_entries() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path().join("extracted");
        let nested = root.join("Data").join("Levels");
        sync_fs::create_dir_all(&nested).expect("dirs");

        let locked = nested.join("read-only.bin");
        sync_fs::write(&locked, b"contents").expect("file");
        let mut permissions = sync_fs::metadata(&locked).expect("metadata").permissions();
        permissions.set_readonly(true);
        sync_fs::set_permissions(&locked, permissions).expect("chmod");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            sync_fs::set_permissions(&nested, sync_fs::Permissions::from_mode(0o555))
                .expect("lock dir");
        }

        remove_dir_all_force(&root).expect("force remove");
        assert!(!root.exists(), "root path itself should be removed");
    }
}
