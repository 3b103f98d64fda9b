use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use tokio::sync::mpsc;

mod config;
mod engine;
mod env;
mod error;
mod install;
mod networking;
mod process;
mod storage;
mod util;

use crate::config::LauncherConfig;
use crate::engine::LauncherEngine;
use crate::engine::state::{AppState, UserAction};

const PROGRESS_TICKS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(
    name = "boh-launcher",
    author,
    version,
    about = "Checks the build repository for updates, installs them, and launches Bag of Holding"
)]
struct Cli {
    /// Alternate config file (defaults to launcher.json in the app directory).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check for an update, then launch the installed build or report the update.
    Play {
        /// Download and install an available update instead of just reporting it.
        #[arg(long)]
        auto_update: bool,
    },
    /// Compare the remote build timestamp against the local record.
    Check,
    /// Download and install the latest build unconditionally.
    Install,
    /// Remove the installed build, the cached archive, and the version record.
    Uninstall,
}

impl Command {
    fn into_action(self) -> UserAction {
        match self {
            Command::Play { auto_update } => UserAction::Play { auto_update },
            Command::Check => UserAction::CheckForUpdates,
            Command::Install => UserAction::Install,
            Command::Uninstall => UserAction::Uninstall,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = match LauncherConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let action = cli
        .command
        .unwrap_or(Command::Play { auto_update: false })
        .into_action();

    let mut launcher_engine = LauncherEngine::new(config);

    // Ctrl-C raises the cancel flag; the download loop notices and aborts.
    let cancel_flag = launcher_engine.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_flag.store(true, Ordering::SeqCst);
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(async move {
        launcher_engine.handle_action(action, &tx).await;
    });

    let mut renderer = StateRenderer::default();
    while let Some(state) = rx.recv().await {
        renderer.render(state);
    }
    let _ = worker.await;

    if renderer.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Terminal subscriber for the engine's state stream.
#[derive(Default)]
struct StateRenderer {
    bar: Option<ProgressBar>,
    failed: bool,
}

impl StateRenderer {
    fn render(&mut self, state: AppState) {
        match state {
            AppState::Idle => {}
            AppState::Checking => println!("Checking for updates..."),
            AppState::UpToDate { version } => {
                println!("Up to date (build {}).", format_version(version));
            }
            AppState::UpdateAvailable { remote, local } => {
                let local = match local {
                    Some(local) => format_version(local),
                    None => "not downloaded".into(),
                };
                println!(
                    "Update available: remote build {} (local: {}).",
                    format_version(remote),
                    local
                );
            }
            AppState::Downloading {
                file,
                progress,
                speed,
            } => {
                let bar = self.bar.get_or_insert_with(new_progress_bar);
                bar.set_position((progress * PROGRESS_TICKS as f32) as u64);
                bar.set_message(format!("{file} {speed}"));
            }
            AppState::Installing => {
                self.finish_bar();
                println!("Extracting...");
            }
            AppState::Installed { version } => {
                println!("Installed build {}.", format_version(version));
            }
            AppState::Launched => println!("Game launched."),
            AppState::Uninstalled => println!("Uninstalled."),
            AppState::Error(msg) => {
                self.finish_bar();
                eprintln!("error: {msg}");
                self.failed = true;
            }
        }
    }

    fn finish_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn new_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(PROGRESS_TICKS);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

fn format_version(version: DateTime<Utc>) -> String {
    version.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
