use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::storage::store::QuotaPolicy;
use crate::tracker::tracker_model::TrackerTimings;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-recall",
    version,
    about = "Remember non-sensitive form input and restore it on return visits"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-recall.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path to the JSON store file (overrides storage.path)
    #[arg(long, global = true)]
    pub store: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the form and field verdicts for a page snapshot
    Classify {
        /// Page snapshot JSON file
        #[arg(long)]
        page: String,
    },

    /// Save every eligible form of a page snapshot
    Save {
        #[arg(long)]
        page: String,
    },

    /// Restore stored values into a page snapshot
    Restore {
        #[arg(long)]
        page: String,

        /// Write the restored snapshot here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Inspect or remove stored entries
    Entries {
        #[command(subcommand)]
        action: EntriesAction,
    },

    /// Play a YAML scenario through the save-prompt state machine
    Replay {
        #[arg(long)]
        scenario: String,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum EntriesAction {
    /// Print every stored entry as JSON
    List,
    /// Delete one entry by key
    Delete { key: String },
    /// Delete every entry
    Clear,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

pub const DEFAULT_CONFIG_PATH: &str = "form-recall.yaml";
pub const DEFAULT_STORE_PATH: &str = "form-recall-store.json";

/// Optional YAML config file: `form-recall.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub timing: TrackerTimings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Receives writes the primary file rejects; defaults to a
    /// `.fallback.json` sibling of the store file.
    #[serde(default)]
    pub fallback_path: Option<String>,

    #[serde(flatten)]
    pub quota: QuotaPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_STORE_PATH.to_string(),
            fallback_path: None,
            quota: QuotaPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceConfig {
    /// JSONL decision trace; disabled when unset
    pub path: Option<String>,
}

fn default_store_path() -> String { DEFAULT_STORE_PATH.to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

/// CLI `--store` wins over the config file.
pub fn resolve_store_path(cli_store: Option<&str>, config: &AppConfig) -> String {
    cli_store
        .map(str::to_string)
        .unwrap_or_else(|| config.storage.path.clone())
}

/// Fallback tier file for `store_path`: `storage.fallback_path`, else
/// `<store>.fallback.json` next to it.
pub fn resolve_fallback_path(store_path: &str, config: &AppConfig) -> PathBuf {
    match &config.storage.fallback_path {
        Some(path) => PathBuf::from(path),
        None => Path::new(store_path).with_extension("fallback.json"),
    }
}

/// `RUST_LOG`-style directive for a `-v` count.
pub fn log_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "form_recall=warn",
        1 => "form_recall=info",
        2 => "form_recall=debug",
        _ => "form_recall=trace",
    }
}
