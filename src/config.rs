//! Layered configuration for the watch service.
//!
//! Sources, lowest precedence first:
//! - Built-in defaults
//! - `.workspace-watch/settings.toml` (searched from the current directory upwards)
//! - Environment variables
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `WW_` and use double underscores
//! to separate nested levels:
//! - `WW_WATCH__PUBLISH_INTERVAL_MS=250` sets `watch.publish_interval_ms`
//! - `WW_BOOTSTRAP__CHUNK_SIZE=50` sets `bootstrap.chunk_size`
//! - `WW_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-project settings directory.
pub const SETTINGS_DIR: &str = ".workspace-watch";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub watch: WatchSettings,

    #[serde(default)]
    pub index: IndexSettings,

    #[serde(default)]
    pub bootstrap: BootstrapSettings,

    #[serde(default)]
    pub enumerator: EnumeratorSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchSettings {
    /// How often pending changes are flushed as one batch
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,

    /// Latency hint handed to the OS event stream
    #[serde(default = "default_stream_latency_ms")]
    pub stream_latency_ms: u64,

    /// How often project topology is re-resolved
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexSettings {
    /// Hard ceiling on files held per workspace
    #[serde(default = "default_max_files_per_workspace")]
    pub max_files_per_workspace: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BootstrapSettings {
    /// URIs handed over inline on the first resolution
    #[serde(default = "default_inline_limit")]
    pub inline_limit: usize,

    /// Maximum events per paced batch for the remainder
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pause between paced batches
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Total files considered for bootstrapping
    #[serde(default = "default_bootstrap_max_files")]
    pub max_files: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EnumeratorSettings {
    /// Extensions accepted in addition to the built-in list (without the dot)
    #[serde(default)]
    pub extra_extensions: Vec<String>,

    /// Directory names skipped in addition to the built-in list
    #[serde(default)]
    pub extra_skip_dirs: Vec<String>,

    /// Also honour `.gitignore` files while walking
    #[serde(default)]
    pub respect_gitignore: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `workspace_watch::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_publish_interval_ms() -> u64 {
    500
}
fn default_stream_latency_ms() -> u64 {
    100
}
fn default_reconcile_interval_ms() -> u64 {
    30_000
}
fn default_max_files_per_workspace() -> usize {
    crate::indexing::MAX_FILES_PER_WORKSPACE
}
fn default_inline_limit() -> usize {
    100
}
fn default_chunk_size() -> usize {
    100
}
fn default_chunk_delay_ms() -> u64 {
    100
}
fn default_bootstrap_max_files() -> usize {
    10_000
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watch: WatchSettings::default(),
            index: IndexSettings::default(),
            bootstrap: BootstrapSettings::default(),
            enumerator: EnumeratorSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            publish_interval_ms: default_publish_interval_ms(),
            stream_latency_ms: default_stream_latency_ms(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            max_files_per_workspace: default_max_files_per_workspace(),
        }
    }
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            inline_limit: default_inline_limit(),
            chunk_size: default_chunk_size(),
            chunk_delay_ms: default_chunk_delay_ms(),
            max_files: default_bootstrap_max_files(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

/// Runtime knobs handed to the registry and each orchestrator.
///
/// Plain durations and counts; nothing in the service reads `Settings` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub publish_interval: Duration,
    pub stream_latency: Duration,
    pub reconcile_interval: Duration,
    pub index_cap: usize,
    pub bootstrap_inline_limit: usize,
    pub bootstrap_chunk_size: usize,
    pub bootstrap_chunk_delay: Duration,
    pub bootstrap_max_files: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Settings::default().watch_config()
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_settings_file()
            .unwrap_or_else(|| PathBuf::from(SETTINGS_DIR).join("settings.toml"));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("WW_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Search from the current directory upwards for a settings directory
    fn find_settings_file() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(SETTINGS_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join("settings.toml"))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Project the settings into the runtime form used by the service
    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            publish_interval: Duration::from_millis(self.watch.publish_interval_ms.max(1)),
            stream_latency: Duration::from_millis(self.watch.stream_latency_ms),
            reconcile_interval: Duration::from_millis(self.watch.reconcile_interval_ms.max(1)),
            index_cap: self.index.max_files_per_workspace,
            bootstrap_inline_limit: self.bootstrap.inline_limit,
            bootstrap_chunk_size: self.bootstrap.chunk_size.max(1),
            bootstrap_chunk_delay: Duration::from_millis(self.bootstrap.chunk_delay_ms),
            bootstrap_max_files: self.bootstrap.max_files,
        }
    }
}
