//! Command-line configuration and log setup for the terminal explorer.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::bucket::OtherPolicy;
use crate::error::{Error, Result};
use crate::model::SortKey;
use crate::navigation::{NavState, ViewMode, ROOT_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Default,
    Size,
    Count,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Default => SortKey::Default,
            SortArg::Size => SortKey::Size,
            SortArg::Count => SortKey::Count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OtherArg {
    Collapsed,
    Expanded,
}

impl From<OtherArg> for OtherPolicy {
    fn from(arg: OtherArg) -> Self {
        match arg {
            OtherArg::Collapsed => OtherPolicy::Collapsed,
            OtherArg::Expanded => OtherPolicy::Expanded,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "storage-explorer", version, about = "Browse bucket storage usage and cost")]
pub struct Args {
    /// Base URL of the metadata API
    #[arg(long, env = "STORAGE_EXPLORER_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Directory to open after the root (must end with '/')
    #[arg(long, default_value = ROOT_PATH)]
    pub start_path: String,

    /// Listing order requested from the API
    #[arg(long, value_enum, default_value_t = SortArg::Default)]
    pub sort: SortArg,

    /// Whether entries past the top three get their own treemap level
    #[arg(long, value_enum, default_value_t = OtherArg::Expanded)]
    pub other: OtherArg,

    /// Open in the treemap view instead of the table
    #[arg(long)]
    pub treemap: bool,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// File receiving diagnostic logs
    #[arg(long, default_value = "storage-explorer.log")]
    pub log_file: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "API URL must start with http:// or https://, got {}",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout must be at least one second".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn other_policy(&self) -> OtherPolicy {
        self.other.into()
    }

    /// Session state to start from. An unusable start path falls back to the root.
    pub fn initial_state(&self) -> NavState {
        let view = if self.treemap {
            ViewMode::Visual
        } else {
            ViewMode::Directory
        };
        let root = NavState::new(view, self.sort.into());
        root.push(&self.start_path).unwrap_or(root)
    }
}

fn build_env_filter(fallback: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(fallback).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, appending to the configured log file.
///
/// The terminal is owned by the UI, so nothing is written to stderr.
pub fn init_logging(args: &Args) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)?;

    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(build_env_filter(&args.log_level))
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install logger: {}", e)))
}
