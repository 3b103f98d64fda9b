use std::path::Path;
use std::process::{Command, Stdio};

use log::{info, warn};

use crate::error::LauncherError;

#[derive(Clone, Default)]
pub struct GameProcess;

impl GameProcess {
    pub fn new() -> Self {
        Self
    }

    /// Spawn the installed game executable as a detached child process.
    /// The game takes no arguments; its own directory is the working dir.
    pub fn launch(&self, executable: &Path) -> Result<(), LauncherError> {
        if !executable.exists() {
            warn!("launch: executable not found at {}", executable.display());
            return Err(LauncherError::io(format!(
                "game executable not found at {}",
                executable.display()
            )));
        }

        let mut cmd = Command::new(executable);
        if let Some(game_dir) = executable.parent() {
            cmd.current_dir(game_dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            // CREATE_NO_WINDOW | DETACHED_PROCESS
            cmd.creation_flags(0x08000000 | 0x00000008);
        }

        info!("launch: starting {}", executable.display());
        cmd.spawn()
            .map_err(|e| LauncherError::io(format!("failed to start game process: {e}")))?;
        info!("launch: process started");
        Ok(())
    }
}
