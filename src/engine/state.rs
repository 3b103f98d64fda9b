use chrono::{DateTime, Utc};

// The central source of truth for whatever front end is subscribed.
#[derive(Clone, Debug)]
pub enum AppState {
    Idle,
    Checking,
    UpToDate {
        version: DateTime<Utc>,
    },
    UpdateAvailable {
        remote: DateTime<Utc>,
        local: Option<DateTime<Utc>>,
    },
    Downloading {
        file: String,
        progress: f32,
        speed: String,
    },
    Installing,
    Installed {
        version: DateTime<Utc>,
    },
    Launched,
    Uninstalled,
    Error(String),
}

// Actions triggered by the user from the CLI layer.
#[derive(Clone, Debug)]
pub enum UserAction {
    Play { auto_update: bool },
    CheckForUpdates,
    Install,
    Uninstall,
}
