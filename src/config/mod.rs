// Configuration management for mediacull
// Directory names and player command live in a TOML file; per-run behavior comes from the CLI

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub directories: DirectoryConfig,
    pub player: PlayerConfig,
}

/// Where relocated files and snapshots go. Relative paths resolve against the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub move_dir: PathBuf,
    pub delete_dir: PathBuf,
    pub good_dir: PathBuf,
    pub not_good_dir: PathBuf,
    /// Marker in the `.N.<tag>` suffix given to name collisions
    pub conflict_tag: String,
    pub snapshot_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub program: String,
    pub base_args: Vec<String>,
}

/// Automatic behaviors chosen on the command line. Fixed for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultActions {
    pub no_delete: bool,
    pub continuous: bool,
    pub move_files: bool,
    pub move_delete: bool,
    pub save_playlist: bool,
    pub move_file_dir: Option<PathBuf>,
    pub start_randomized: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            move_dir: PathBuf::from("sett"),
            delete_dir: PathBuf::from(".delete"),
            good_dir: PathBuf::from("_gg"),
            not_good_dir: PathBuf::from("ngg"),
            conflict_tag: "notsame".to_string(),
            snapshot_file: PathBuf::from("__pl.json"),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: "mpv".to_string(),
            base_args: vec!["--fs".to_string()],
        }
    }
}

impl Config {
    /// Load from the user config dir, writing the defaults there on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write config {}", path.display()))?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("mediacull");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[directories]\ndelete_dir = \"trash\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.directories.delete_dir, PathBuf::from("trash"));
        assert_eq!(config.directories.move_dir, PathBuf::from("sett"));
        assert_eq!(config.directories.conflict_tag, "notsame");
        assert_eq!(config.player.program, "mpv");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.player.base_args = vec!["--fs".into(), "--loop=no".into()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.player.base_args, config.player.base_args);
        assert_eq!(loaded.directories.snapshot_file, PathBuf::from("__pl.json"));
    }

    #[test]
    fn test_broken_config_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "directories = 3").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
