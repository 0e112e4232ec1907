// Configuration for the command-line front end

use chrono::{Days, Local, NaiveDate, Utc};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application directory name under the platform config/data dirs
pub const APP_NAME: &str = "streakstore";

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "streakstore.yml";

/// Which calendar decides what "today" is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clock {
    #[default]
    Local,
    Utc,
}

impl Clock {
    pub fn today(self) -> NaiveDate {
        match self {
            Clock::Local => Local::now().date_naive(),
            Clock::Utc => Utc::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the streak database
    pub store_dir: PathBuf,
    pub clock: Clock,
    /// Days a streak may go without a continue before the startup sweep kills it.
    /// With 1, a streak continued yesterday is still alive today.
    pub grace_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            clock: Clock::default(),
            grace_days: 1,
        }
    }
}

impl Config {
    /// Load config from an explicit path, or the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        debug!(path = ?path, ?config, "Loaded config");
        Ok(config)
    }

    /// Cutoff date handed to the expiry sweep for `today`
    pub fn sweep_cutoff(&self, today: NaiveDate) -> Result<NaiveDate> {
        today
            .checked_sub_days(Days::new(u64::from(self.grace_days)))
            .ok_or_else(|| eyre!("grace_days {} is out of range", self.grace_days))
    }
}

/// `<config_dir>/streakstore/streakstore.yml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}

/// `<data_dir>/streakstore`, falling back to `.streakstore` in the working directory
pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(".streakstore"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.clock, Clock::Local);
        assert_eq!(config.grace_days, 1);
        assert!(config.store_dir.ends_with(APP_NAME) || config.store_dir.ends_with(".streakstore"));
    }

    #[test]
    fn test_from_file_partial() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "clock: utc\nstore_dir: /tmp/streaks\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.clock, Clock::Utc);
        assert_eq!(config.store_dir, PathBuf::from("/tmp/streaks"));
        // Unspecified fields keep their defaults
        assert_eq!(config.grace_days, 1);
    }

    #[test]
    fn test_from_file_missing_explicit_path() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(&temp.path().join("nope.yml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "clock: sometimes\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_sweep_cutoff() {
        let mut config = Config::default();
        assert_eq!(config.sweep_cutoff(day("2024-01-10")).unwrap(), day("2024-01-09"));

        config.grace_days = 0;
        assert_eq!(config.sweep_cutoff(day("2024-01-10")).unwrap(), day("2024-01-10"));

        config.grace_days = 10;
        assert_eq!(config.sweep_cutoff(day("2024-03-01")).unwrap(), day("2024-02-20"));
    }
}
