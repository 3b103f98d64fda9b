use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::config::LauncherConfig;
use crate::engine::models::VersionCheck;
use crate::engine::state::{AppState, UserAction};
use crate::error::LauncherError;
use crate::install;
use crate::networking::NetworkClient;
use crate::process::GameProcess;
use crate::storage::{self, StorageManager};
use crate::util::progress_fraction;

pub mod models;
pub mod state;

/// Clamps download progress so the published fraction never goes backwards
/// and ends at exactly 1.0.
#[derive(Debug, Default)]
struct ProgressGauge {
    last: f32,
}

impl ProgressGauge {
    fn advance(&mut self, fraction: f32) -> f32 {
        self.last = self.last.max(fraction.clamp(0.0, 1.0));
        self.last
    }

    fn complete(&mut self) -> f32 {
        self.last = 1.0;
        self.last
    }
}

pub struct LauncherEngine {
    config: LauncherConfig,
    networking: NetworkClient,
    storage: StorageManager,
    process: GameProcess,
    cancel_flag: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
}

impl LauncherEngine {
    pub fn new(config: LauncherConfig) -> Self {
        let networking = NetworkClient::new(&config);
        Self {
            config,
            networking,
            storage: StorageManager::new(),
            process: GameProcess::new(),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    pub async fn handle_action(
        &mut self,
        action: UserAction,
        updates: &mpsc::UnboundedSender<AppState>,
    ) {
        // Operations share the local archive and version record, so a
        // second one is rejected rather than raced.
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("action rejected: another operation is in flight");
            let _ = updates.send(AppState::Error(
                "another operation is already in progress".into(),
            ));
            return;
        }
        self.cancel_flag.store(false, Ordering::SeqCst);

        match action {
            UserAction::CheckForUpdates => {
                info!("action: CheckForUpdates");
                match self.check(updates).await {
                    Ok(check) => self.publish_check_outcome(&check, updates),
                    Err(err) => self.fail(err, updates),
                }
            }
            UserAction::Play { auto_update } => {
                info!("action: Play (auto_update={auto_update})");
                match self.check(updates).await {
                    Ok(check) if check.update_available() => {
                        self.publish_check_outcome(&check, updates);
                        if auto_update {
                            match self.download_and_install(check.remote, updates).await {
                                Ok(()) => {}
                                Err(err) => self.fail(err, updates),
                            }
                        }
                    }
                    Ok(check) => {
                        self.publish_check_outcome(&check, updates);
                        match self.launch() {
                            Ok(()) => {
                                updates.send(AppState::Launched).ok();
                                updates.send(AppState::Idle).ok();
                            }
                            Err(err) => self.fail(err, updates),
                        }
                    }
                    Err(err) => self.fail(err, updates),
                }
            }
            UserAction::Install => {
                info!("action: Install");
                match self.check(updates).await {
                    Ok(check) => {
                        match self.download_and_install(check.remote, updates).await {
                            Ok(()) => {}
                            Err(err) => self.fail(err, updates),
                        }
                    }
                    Err(err) => self.fail(err, updates),
                }
            }
            UserAction::Uninstall => {
                info!("action: Uninstall");
                match self.storage.uninstall(&self.config).await {
                    Ok(()) => {
                        updates.send(AppState::Uninstalled).ok();
                    }
                    Err(err) => self.fail(err, updates),
                }
            }
        }

        self.in_flight.store(false, Ordering::SeqCst);
    }

    /// Read the local record and fetch the remote build timestamp. A failed
    /// check is terminal: nothing is assumed and nothing gets launched.
    async fn check(
        &self,
        updates: &mpsc::UnboundedSender<AppState>,
    ) -> Result<VersionCheck, LauncherError> {
        updates.send(AppState::Checking).ok();
        let local = self.storage.read_local_version().await;
        debug!("check: local version {local:?}");
        let remote = self.networking.latest_artifact_commit(&self.config).await?;
        Ok(VersionCheck { remote, local })
    }

    fn publish_check_outcome(
        &self,
        check: &VersionCheck,
        updates: &mpsc::UnboundedSender<AppState>,
    ) {
        let state = if check.update_available() {
            AppState::UpdateAvailable {
                remote: check.remote,
                local: check.local,
            }
        } else {
            AppState::UpToDate {
                version: check.remote,
            }
        };
        updates.send(state).ok();
    }

    /// Fetch the build archive, replace the extracted directory, and persist
    /// the new local version.
    async fn download_and_install(
        &self,
        remote: DateTime<Utc>,
        updates: &mpsc::UnboundedSender<AppState>,
    ) -> Result<(), LauncherError> {
        let file_name = self.config.artifact_file_name();
        let kind = install::guess_archive_kind(&file_name).ok_or_else(|| {
            LauncherError::parse(format!("unsupported archive format: {file_name}"))
        })?;
        let dest = self.storage.cache_path(&file_name);

        updates
            .send(AppState::Downloading {
                file: file_name.clone(),
                progress: 0.0,
                speed: "starting".into(),
            })
            .ok();

        let mut gauge = ProgressGauge::default();
        let progress_tx = updates.clone();
        let progress_file = file_name.clone();
        self.networking
            .download_to_path(
                &self.config.artifact_url(),
                &dest,
                Some(self.cancel_flag.clone()),
                |downloaded, total, speed| {
                    let state = AppState::Downloading {
                        file: progress_file.clone(),
                        progress: gauge.advance(progress_fraction(downloaded, total)),
                        speed: speed.to_owned(),
                    };
                    let _ = progress_tx.send(state);
                },
            )
            .await?;

        updates
            .send(AppState::Downloading {
                file: file_name.clone(),
                progress: gauge.complete(),
                speed: "0 B/s".into(),
            })
            .ok();

        if let Some(expected) = self.config.sha256.as_deref() {
            install::verify_sha256(&dest, expected)?;
        }

        updates.send(AppState::Installing).ok();
        let game_dir = self.storage.game_path(&self.config);
        if game_dir.exists() {
            storage::remove_dir_all_force(&game_dir)?;
        }
        install::extract_archive(&dest, &self.storage.install_root(), kind)?;

        self.storage.write_local_version(remote).await?;
        updates.send(AppState::Installed { version: remote }).ok();
        info!("install: build {remote} ready");
        Ok(())
    }

    fn launch(&self) -> Result<(), LauncherError> {
        self.process
            .launch(&self.storage.executable_path(&self.config))
    }

    fn fail(&self, err: LauncherError, updates: &mpsc::UnboundedSender<AppState>) {
        error!("{err}");
        let _ = updates.send(AppState::Error(err.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_gauge_never_goes_backwards() {
        let mut gauge = ProgressGauge::default();
        assert_eq!(gauge.advance(0.2), 0.2);
        assert_eq!(gauge.advance(0.5), 0.5);
        // A late or recomputed sample may be lower; the published value holds.
        assert_eq!(gauge.advance(0.3), 0.5);
        assert_eq!(gauge.advance(0.9), 0.9);
        assert_eq!(gauge.complete(), 1.0);
    }

    #[test]
    fn progress_gauge_clamps_out_of_range_samples() {
        let mut gauge = ProgressGauge::default();
        assert_eq!(gauge.advance(-0.5), 0.0);
        assert_eq!(gauge.advance(1.5), 1.0);
    }
}
