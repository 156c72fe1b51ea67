//! Bot configuration via `rampart.toml`.
//!
//! A single toml file drives the bot. On first load a default file is
//! written next to the requested path so operators always have a complete
//! template to edit. At runtime the file is re-read by a watcher task and
//! swapped atomically through [`SharedConfig`]: handlers take a snapshot at
//! entry and complete against that snapshot, so a mid-command reload never
//! changes the rules under a running handler.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::ChannelId;

/// Which parser a configured scanner uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerKind {
    /// The fortification sheet.
    Fort,
    /// The main undermining sheet.
    UndermineMain,
    /// The snipe undermining sheet.
    UndermineSnipe,
    /// The kill-on-sight sheet.
    Kos,
    /// The carrier id registry sheet.
    Carriers,
    /// The recruit roster sheet.
    Recruits,
}

/// One scanner entry: which remote document and tab it watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Remote document id.
    pub id: String,
    /// Active tab within the document, e.g. `Cycle 309`.
    pub page: String,
    /// Which parser interprets the tab.
    pub kind: ScannerKind,
}

/// Filesystem locations used by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Service-account credentials for the sheet API.
    #[serde(default = "default_service_json")]
    pub service_json: PathBuf,
    /// Directory receiving per-schema feed archives.
    #[serde(default = "default_feed_dir")]
    pub feed_archive: PathBuf,
}

fn default_service_json() -> PathBuf {
    PathBuf::from("data/service_sheets.json")
}

fn default_feed_dir() -> PathBuf {
    PathBuf::from("data/feed")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { service_json: default_service_json(), feed_archive: default_feed_dir() }
    }
}

/// Listen ports for auxiliary surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortsConfig {
    /// Status page port.
    #[serde(default = "default_web_port")]
    pub web: u16,
    /// Event feed subscription port.
    #[serde(default = "default_feed_port")]
    pub feed: u16,
}

fn default_web_port() -> u16 {
    8000
}

fn default_feed_port() -> u16 {
    9500
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self { web: default_web_port(), feed: default_feed_port() }
    }
}

/// Database connection strings, keyed by profile name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbsConfig {
    /// Campaign state database.
    #[serde(default)]
    pub primary: String,
    /// Read-mostly reference database.
    #[serde(default)]
    pub reference: String,
}

/// The complete bot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Command prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Headquarters system of the faction's power, used for trigger math.
    #[serde(default = "default_power_hq")]
    pub power_hq: String,
    /// Channel that receives carrier movement summaries.
    #[serde(default)]
    pub carrier_channel: Option<ChannelId>,
    /// Channel that receives bug reports from `feedback`.
    #[serde(default)]
    pub feedback_channel: Option<ChannelId>,
    /// Channel that receives snipe-sheet traffic.
    #[serde(default)]
    pub snipe_channel: Option<ChannelId>,
    /// Seconds between debounced sheet rescans.
    #[serde(default = "default_scheduler_delay")]
    pub scheduler_delay: u64,
    /// A target missing at most this many merits is deferred.
    #[serde(default = "default_defer_missing")]
    pub defer_missing: i64,
    /// Largest single drop accepted, absolute value.
    #[serde(default = "default_max_drop")]
    pub max_drop: i64,
    /// Seconds before transient replies self-delete.
    #[serde(default = "default_ttl")]
    pub ttl: u64,
    /// Hours before the cycle tick when priority targets are pushed.
    #[serde(default = "default_hours_to_tick")]
    pub hours_to_tick_priority: u64,
    /// Emoji substitutions for replies, name -> rendered form.
    #[serde(default)]
    pub emojis: BTreeMap<String, String>,
    /// Filesystem locations.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Listen ports.
    #[serde(default)]
    pub ports: PortsConfig,
    /// Database profiles.
    #[serde(default)]
    pub dbs: DbsConfig,
    /// Configured scanners, keyed by registry name.
    #[serde(default)]
    pub scanners: BTreeMap<String, ScannerConfig>,
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_power_hq() -> String {
    "Nanomam".to_string()
}

fn default_scheduler_delay() -> u64 {
    10
}

fn default_defer_missing() -> i64 {
    650
}

fn default_max_drop() -> i64 {
    800
}

fn default_ttl() -> u64 {
    60
}

fn default_hours_to_tick() -> u64 {
    36
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            power_hq: default_power_hq(),
            carrier_channel: None,
            feedback_channel: None,
            snipe_channel: None,
            scheduler_delay: default_scheduler_delay(),
            defer_missing: default_defer_missing(),
            max_drop: default_max_drop(),
            ttl: default_ttl(),
            hours_to_tick_priority: default_hours_to_tick(),
            emojis: BTreeMap::new(),
            paths: PathsConfig::default(),
            ports: PortsConfig::default(),
            dbs: DbsConfig::default(),
            scanners: BTreeMap::new(),
        }
    }
}

impl BotConfig {
    /// Load configuration from `path`.
    ///
    /// When the file does not exist, a default configuration is written
    /// there first so operators can edit a complete template.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let cfg = Self::default();
            cfg.write(path)?;
            return Ok(cfg);
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::MissingConfig(format!("invalid {}: {e}", path.display())))
    }

    /// Serialize this configuration and atomically replace the file at
    /// `path` (write a sibling temp file, then rename over the target).
    pub fn write(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("config serialize: {e}")))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// A hot-swappable handle on the current configuration.
///
/// Readers call [`SharedConfig::snapshot`] once per handler and keep the
/// returned `Arc` for the handler's whole lifetime; the watcher calls
/// [`SharedConfig::swap`] with a freshly parsed config on file change.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<BotConfig>>>,
}

impl SharedConfig {
    /// Wrap an initial configuration.
    pub fn new(cfg: BotConfig) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(cfg))) }
    }

    /// Take a snapshot reference of the current configuration.
    pub fn snapshot(&self) -> Arc<BotConfig> {
        Arc::clone(&self.inner.read())
    }

    /// Replace the current configuration. Existing snapshots are unaffected.
    pub fn swap(&self, cfg: BotConfig) {
        *self.inner.write() = Arc::new(cfg);
    }
}

impl std::fmt::Debug for SharedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConfig").finish_non_exhaustive()
    }
}
