use std::env;
use std::fs;
use std::path::PathBuf;

/// Returns the per-user root directory used by the launcher. The build
/// archive extracts directly beneath it.
pub fn default_app_dir() -> PathBuf {
    let base = match env::consts::OS {
        "windows" => env::var_os("LOCALAPPDATA")
            .or_else(|| env::var_os("APPDATA"))
            .map(PathBuf::from),
        "macos" => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join("Library").join("Application Support")),
        _ => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join(".local").join("share")),
    }
    .unwrap_or_else(|| PathBuf::from("."));

    base.join("boh-launcher")
}

/// Directory the downloaded archive is cached in.
pub fn cache_dir() -> PathBuf {
    default_app_dir().join("cache")
}

/// Create the on-disk folder layout expected by the launcher.
pub fn ensure_base_dirs() -> std::io::Result<()> {
    for dir in [default_app_dir(), cache_dir()] {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}
