use crate::error::{MdvError, Result};
use crate::naming::{CounterPolicy, DEFAULT_FILE_NAME};
use crate::recent::{RecentCache, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_SNAPSHOT_CHARS};
use crate::store::DEFAULT_QUOTA;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.json";

/// Configuration for mdview, stored in `<data dir>/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct MdvConfig {
    /// How many documents the recent list keeps
    #[serde(default = "default_recent_max")]
    pub recent_max: usize,

    /// Snapshots longer than this many characters are truncated
    #[serde(default = "default_snapshot_max_chars")]
    pub snapshot_max_chars: usize,

    /// Store capacity in bytes of key + value
    #[serde(default = "default_store_quota")]
    pub store_quota: usize,

    /// When a numbered save-as consumes its counter
    #[serde(default)]
    pub counter_policy: CounterPolicy,

    /// Name used for numbered copies of documents that have none
    #[serde(default = "default_file_name")]
    pub default_file_name: String,

    /// Directory numbered copies are written to (current directory if unset)
    #[serde(default)]
    pub save_dir: Option<PathBuf>,

    /// Page that share links point at, e.g. `https://me.example/mdview/`
    #[serde(default)]
    pub share_base: Option<String>,
}

fn default_recent_max() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_snapshot_max_chars() -> usize {
    DEFAULT_MAX_SNAPSHOT_CHARS
}

fn default_store_quota() -> usize {
    DEFAULT_QUOTA
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

impl Default for MdvConfig {
    fn default() -> Self {
        Self {
            recent_max: default_recent_max(),
            snapshot_max_chars: default_snapshot_max_chars(),
            store_quota: default_store_quota(),
            counter_policy: CounterPolicy::default(),
            default_file_name: default_file_name(),
            save_dir: None,
            share_base: None,
        }
    }
}

impl MdvConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(MdvError::Io)?;
        let config: MdvConfig = serde_json::from_str(&content).map_err(MdvError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(MdvError::Io)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(MdvError::Serialization)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content).map_err(MdvError::Io)?;
        Ok(())
    }

    pub fn recent_cache(&self) -> RecentCache {
        RecentCache::new(self.recent_max, self.snapshot_max_chars)
    }

    /// Where numbered copies go, relative paths resolved against `cwd`.
    pub fn save_dir_from(&self, cwd: &Path) -> PathBuf {
        match &self.save_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        }
    }
}
