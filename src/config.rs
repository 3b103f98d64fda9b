use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::env;
use crate::error::LauncherError;

const CONFIG_FILE: &str = "launcher.json";

// Defaults point at the Bag of Holding demo build repository.
const DEFAULT_REPO: &str = "ryan-pf/DemoGameLauncher";
const DEFAULT_BRANCH: &str = "master";
const DEFAULT_ARTIFACT_PATH: &str = "Builds/boh-build-win.zip";
const DEFAULT_GAME_DIR: &str = "boh-build-win";
const DEFAULT_EXECUTABLE: &str = "BagOfHolding.exe";
const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30 * 60;

/// Launcher configuration, read from `launcher.json` in the app directory.
/// Every field has a default so a missing file means a usable config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// GitHub repository holding the build artifact, as `owner/name`.
    pub repo: String,
    /// Branch the artifact is fetched from.
    pub branch: String,
    /// In-repository path of the build archive.
    pub artifact_path: String,
    /// Directory name the archive extracts to under the install root.
    pub game_dir: String,
    /// Executable file name inside the game directory.
    pub executable: String,
    /// Optional hex SHA-256 of the archive; verified before extraction.
    pub sha256: Option<String>,
    pub check_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            repo: DEFAULT_REPO.into(),
            branch: DEFAULT_BRANCH.into(),
            artifact_path: DEFAULT_ARTIFACT_PATH.into(),
            game_dir: DEFAULT_GAME_DIR.into(),
            executable: DEFAULT_EXECUTABLE.into(),
            sha256: None,
            check_timeout_secs: DEFAULT_CHECK_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

impl LauncherConfig {
    /// Load the config from `path`, or from the app directory when no
    /// explicit path is given. A missing default file yields the defaults;
    /// a file that exists but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, LauncherError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (env::default_app_dir().join(CONFIG_FILE), false),
        };

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let config: Self = serde_json::from_str(&contents).map_err(|e| {
                    LauncherError::parse(format!("invalid config {}: {e}", path.display()))
                })?;
                info!("config: loaded {}", path.display());
                Ok(config)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
                debug!("config: {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(LauncherError::io(format!(
                "unable to read config {}: {err}",
                path.display()
            ))),
        }
    }

    /// URL of the commits API query scoped to the artifact path.
    pub fn commits_url(&self) -> String {
        format!(
            "https://api.github.com/repos/{}/commits?path={}&page=1&per_page=1",
            self.repo, self.artifact_path
        )
    }

    /// Raw-file URL of the build archive.
    pub fn artifact_url(&self) -> String {
        format!(
            "https://github.com/{}/raw/{}/{}",
            self.repo, self.branch, self.artifact_path
        )
    }

    /// File name of the build archive, e.g. `boh-build-win.zip`.
    pub fn artifact_file_name(&self) -> String {
        self.artifact_path
            .rsplit('/')
            .next()
            .unwrap_or(self.artifact_path.as_str())
            .to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_point_at_demo_repo() {
        let config = LauncherConfig::default();
        assert_eq!(config.repo, "ryan-pf/DemoGameLauncher");
        assert_eq!(config.artifact_file_name(), "boh-build-win.zip");
        assert_eq!(config.check_timeout_secs, 10);
    }

    #[test]
    fn builds_github_urls() {
        let config = LauncherConfig::default();
        assert_eq!(
            config.commits_url(),
            "https://api.github.com/repos/ryan-pf/DemoGameLauncher/commits?path=Builds/boh-build-win.zip&page=1&per_page=1"
        );
        assert_eq!(
            config.artifact_url(),
            "https://github.com/ryan-pf/DemoGameLauncher/raw/master/Builds/boh-build-win.zip"
        );
    }

    #[test]
    fn partial_file_falls_back_to_defaults_per_field() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "repo": "someone/else", "branch": "main" }}"#).expect("write");

        let config = LauncherConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.repo, "someone/else");
        assert_eq!(config.branch, "main");
        assert_eq!(config.executable, "BagOfHolding.exe");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{ not json").expect("write");

        let err = LauncherConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, crate::error::LauncherError::Parse(_)));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = LauncherConfig::load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, crate::error::LauncherError::Io(_)));
    }
}
