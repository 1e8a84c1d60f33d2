use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};
use crate::reports::Policy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the `YYYY/MM/DD` export tree.
    pub data_dir: String,
    pub policy: Policy,
    /// Rows printed by `show` and `lookup` before truncating. `drill` lists
    /// up to `policy.sample_limit` rows.
    pub preview_rows: usize,
}

fn default_preview_rows() -> usize {
    20
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            policy: Policy::default(),
            preview_rows: default_preview_rows(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("recon-dash")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recon-data")
}

fn read_settings(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| DashError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn load_settings() -> Settings {
    read_settings(&settings_path())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    write_settings(&settings_path(), settings)
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

/// Export root: the `--data-dir` override if given, else the configured one.
pub fn data_dir(override_dir: Option<&str>) -> PathBuf {
    match override_dir {
        Some(dir) => PathBuf::from(shellexpand_path(dir)),
        None => PathBuf::from(shellexpand_path(&load_settings().data_dir)),
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/exports".to_string(),
            policy: Policy {
                match_rate_floor: 90.0,
                ..Policy::default()
            },
            preview_rows: 5,
        };
        write_settings(&path, &settings).unwrap();
        let loaded = read_settings(&path);
        assert_eq!(loaded.data_dir, "/tmp/exports");
        assert_eq!(loaded.policy.match_rate_floor, 90.0);
        assert_eq!(loaded.preview_rows, 5);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = read_settings(&dir.path().join("absent.json"));
        assert_eq!(s.policy, Policy::default());
        assert_eq!(s.preview_rows, 20);
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "policy": {"divergence_pct": 25}}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.policy.divergence_pct, 25.0);
        assert_eq!(s.policy.match_rate_floor, 80.0);
        assert_eq!(s.policy.sample_limit, 100);
        assert_eq!(s.preview_rows, 20);
    }

    #[test]
    fn test_policy_only_file_keeps_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"policy": {"match_rate_floor": 95}}"#).unwrap();
        let s = read_settings(&path);
        assert_eq!(s.policy.match_rate_floor, 95.0);
        assert_eq!(s.policy.one_sided_pct, 5.0);
        assert_eq!(s.data_dir, Settings::default().data_dir);
        assert_eq!(s.preview_rows, 20);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(read_settings(&path).policy, Policy::default());
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("settings.json");
        write_settings(&path, &Settings::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_data_dir_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let chosen = data_dir(Some(dir.path().to_str().unwrap()));
        assert_eq!(chosen, std::fs::canonicalize(dir.path()).unwrap());
    }
}
