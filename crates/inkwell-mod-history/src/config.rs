/// Configuration and utility functions for the history engine.
use std::path::{Path, PathBuf};

use inkwell_config::EngineConfig;

use crate::policy::CadencePolicy;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "INKWELL_DATA_DIR";

/// Store a snapshot at least once every this many commits.
const DEFAULT_SNAPSHOT_INTERVAL: usize = 20;

/// Snapshot when a diff is at least this fraction of the content size.
const DEFAULT_MAX_PATCH_RATIO: f64 = 0.75;

/// History listing page size when the caller doesn't pick one.
const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page a caller may request.
const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// How many times a commit re-mints its timestamp after an out-of-order append.
const DEFAULT_APPEND_RETRIES: usize = 3;

/// Configuration for the history engine.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Snapshot cadence in commits.
    pub snapshot_interval: usize,
    /// Diff-to-content size ratio that forces a snapshot.
    pub max_patch_ratio: f64,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Timestamp re-mint attempts per commit.
    pub append_retries: usize,
    /// Root directory for the history database.
    pub data_dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            max_patch_ratio: DEFAULT_MAX_PATCH_RATIO,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            append_retries: DEFAULT_APPEND_RETRIES,
            data_dir: resolve_data_dir(None),
        }
    }
}

impl From<&EngineConfig> for HistoryConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            snapshot_interval: config.snapshot_interval.max(1),
            max_patch_ratio: config.max_patch_ratio,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            append_retries: DEFAULT_APPEND_RETRIES,
            data_dir: resolve_data_dir(config.data_dir_override()),
        }
    }
}

impl HistoryConfig {
    /// The snapshot cadence described by this config.
    pub fn cadence(&self) -> CadencePolicy {
        CadencePolicy {
            interval: self.snapshot_interval,
            max_patch_ratio: self.max_patch_ratio,
        }
    }

    /// Resolves a requested page size against the configured default and cap.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

/// Resolves the data directory path.
///
/// Resolution order:
/// 1. `INKWELL_DATA_DIR` environment variable
/// 2. `configured` (the config file's `data_dir`)
/// 3. `inkwell/` under the platform's local data directory
/// 4. `.data/` directory next to the executable
pub fn resolve_data_dir(configured: Option<PathBuf>) -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    if let Some(dir) = configured {
        return dir;
    }
    if let Some(dir) = dirs::data_local_dir() {
        return dir.join("inkwell");
    }
    let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
    exe.parent().unwrap_or(Path::new(".")).join(".data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HistoryConfig::default();
        assert_eq!(config.snapshot_interval, 20);
        assert!((config.max_patch_ratio - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.append_retries, 3);
    }

    #[test]
    fn test_from_engine_config() {
        let engine = EngineConfig {
            snapshot_interval: 4,
            max_patch_ratio: 0.3,
            default_page_size: 5,
            max_page_size: 10,
            ..Default::default()
        };
        let config = HistoryConfig::from(&engine);
        assert_eq!(config.snapshot_interval, 4);
        assert!((config.max_patch_ratio - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.cadence().interval, 4);
        assert_eq!(config.page_size(None), 5);
    }

    #[test]
    fn test_page_size_clamped() {
        let config = HistoryConfig::default();
        assert_eq!(config.page_size(None), 20);
        assert_eq!(config.page_size(Some(0)), 1);
        assert_eq!(config.page_size(Some(50)), 50);
        assert_eq!(config.page_size(Some(5_000)), 100);
    }

    #[test]
    fn test_resolve_data_dir_prefers_env_var() {
        // Save and restore env var
        let original = std::env::var(DATA_DIR_ENV).ok();
        std::env::set_var(DATA_DIR_ENV, "/custom/path");
        let dir = resolve_data_dir(Some(PathBuf::from("/configured")));
        assert_eq!(dir, PathBuf::from("/custom/path"));

        std::env::remove_var(DATA_DIR_ENV);
        let dir = resolve_data_dir(Some(PathBuf::from("/configured")));
        assert_eq!(dir, PathBuf::from("/configured"));

        // Restore
        if let Some(val) = original {
            std::env::set_var(DATA_DIR_ENV, val);
        }
    }
}
