/// Engine configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level engine configuration, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the history database. Empty = platform default.
    pub data_dir: String,
    /// Store a full snapshot at least once every this many commits (minimum 1).
    pub snapshot_interval: usize,
    /// Store a snapshot instead of a diff when the encoded diff is at least
    /// this fraction of the new content's length.
    pub max_patch_ratio: f64,
    /// Page size used by history listings when the caller does not pick one.
    pub default_page_size: usize,
    /// Upper bound for any requested page size.
    pub max_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            snapshot_interval: 20,
            max_patch_ratio: 0.75,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl EngineConfig {
    /// Returns the config file path: exe directory + `inkwell.json`.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join("inkwell.json")))
            .unwrap_or_else(|| PathBuf::from("inkwell.json"))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (unreadable file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {}: {e:#}", path.display());
                }
            }
            // Return defaults on error (don't overwrite broken file)
            let mut config = Self::default();
            config.sanitize();
            config
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e}", path.display());
            }
            config
        }
    }

    /// Loads and sanitizes config from an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: EngineConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.sanitize();
        Ok(config)
    }

    /// Saves config to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Returns the configured data directory, if one was set.
    pub fn data_dir_override(&self) -> Option<PathBuf> {
        let trimmed = self.data_dir.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// Clamps values to valid ranges.
    pub fn sanitize(&mut self) {
        self.snapshot_interval = self.snapshot_interval.max(1);
        if !self.max_patch_ratio.is_finite() {
            self.max_patch_ratio = Self::default().max_patch_ratio;
        }
        self.max_patch_ratio = self.max_patch_ratio.clamp(0.05, 10.0);
        self.max_page_size = self.max_page_size.max(1);
        self.default_page_size = self.default_page_size.clamp(1, self.max_page_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.data_dir.is_empty());
        assert_eq!(config.snapshot_interval, 20);
        assert!((config.max_patch_ratio - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 100);
    }

    #[test]
    fn test_sanitize_zero_interval() {
        let mut config = EngineConfig {
            snapshot_interval: 0,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.snapshot_interval, 1);
    }

    #[test]
    fn test_sanitize_clamps_patch_ratio() {
        let mut config = EngineConfig {
            max_patch_ratio: 0.0,
            ..Default::default()
        };
        config.sanitize();
        assert!((config.max_patch_ratio - 0.05).abs() < f64::EPSILON);

        config.max_patch_ratio = 500.0;
        config.sanitize();
        assert!((config.max_patch_ratio - 10.0).abs() < f64::EPSILON);

        config.max_patch_ratio = f64::NAN;
        config.sanitize();
        assert!((config.max_patch_ratio - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sanitize_page_sizes() {
        let mut config = EngineConfig {
            default_page_size: 500,
            max_page_size: 50,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.default_page_size, 50);

        config.max_page_size = 0;
        config.default_page_size = 0;
        config.sanitize();
        assert_eq!(config.max_page_size, 1);
        assert_eq!(config.default_page_size, 1);
    }

    #[test]
    fn test_data_dir_override() {
        let mut config = EngineConfig::default();
        assert!(config.data_dir_override().is_none());

        config.data_dir = "   ".to_string();
        assert!(config.data_dir_override().is_none());

        config.data_dir = "/srv/inkwell".to_string();
        assert_eq!(config.data_dir_override(), Some(PathBuf::from("/srv/inkwell")));
    }
}
