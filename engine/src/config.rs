use serde::Deserialize;
use std::path::{Path, PathBuf};

use tether_types::{PersistenceMode, StorageLocation};

/// Maximum results requested per storage query.
pub const DEFAULT_QUERY_MAX_RESULTS: u32 = 20;

// Default value function for serde (bool::default() is false, so only true needs a fn)
pub(crate) const fn default_true() -> bool {
    true
}

/// On-disk configuration (`~/.tether/config.toml`).
#[derive(Debug, Default, Deserialize)]
pub struct TetherConfig {
    pub storage: Option<StorageConfig>,
    pub query: Option<QueryConfig>,
    pub engine: Option<EngineSection>,
    pub log: Option<LogConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    /// Where anchors are saved and erased. Default: local.
    #[serde(default)]
    pub location: StorageLocation,
    #[serde(default)]
    pub persistence_mode: PersistenceMode,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryConfig {
    /// Bound on results per load query. Default: 20.
    pub max_results: Option<u32>,
    /// Query timeout in nanoseconds. Zero (the default) lets the runtime pick.
    #[serde(default)]
    pub timeout_ns: i64,
}

#[derive(Debug, Deserialize)]
pub struct EngineSection {
    /// Enable STORABLE and save every anchor as soon as it is created.
    #[serde(default = "default_true")]
    pub persist_on_create: bool,
    /// Query stored anchors on the first tick.
    #[serde(default)]
    pub load_on_start: bool,
    /// Warn once about requests pending this many ticks. Zero disables.
    #[serde(default)]
    pub stale_request_ticks: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            persist_on_create: true,
            load_on_start: false,
            stale_request_ticks: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl TetherConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        Self::load_from(&path)
    }

    /// Load from an explicit path. A missing file is `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tether").join("config.toml"))
}

/// Effective engine settings, resolved once from [`TetherConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub storage_location: StorageLocation,
    pub persistence_mode: PersistenceMode,
    pub query_max_results: u32,
    pub query_timeout_ns: i64,
    pub persist_on_create: bool,
    pub load_on_start: bool,
    pub stale_request_ticks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_config(None)
    }
}

impl From<&TetherConfig> for EngineConfig {
    fn from(config: &TetherConfig) -> Self {
        Self::from_config(Some(config))
    }
}

impl EngineConfig {
    #[must_use]
    pub fn from_config(config: Option<&TetherConfig>) -> Self {
        let storage = config.and_then(|c| c.storage.as_ref());
        let query = config.and_then(|c| c.query.as_ref());
        let engine = config.and_then(|c| c.engine.as_ref());

        let query_max_results = match query.and_then(|q| q.max_results) {
            Some(0) => {
                tracing::warn!(
                    "query.max_results = 0 would never return anchors; using {DEFAULT_QUERY_MAX_RESULTS}"
                );
                DEFAULT_QUERY_MAX_RESULTS
            }
            Some(n) => n,
            None => DEFAULT_QUERY_MAX_RESULTS,
        };

        Self {
            storage_location: storage.map(|s| s.location).unwrap_or_default(),
            persistence_mode: storage.map(|s| s.persistence_mode).unwrap_or_default(),
            query_max_results,
            query_timeout_ns: query.map_or(0, |q| q.timeout_ns.max(0)),
            persist_on_create: engine.is_none_or(|e| e.persist_on_create),
            load_on_start: engine.is_some_and(|e| e.load_on_start),
            stale_request_ticks: engine.map_or(0, |e| e.stale_request_ticks),
        }
    }
}
