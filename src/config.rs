// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::model::ParserConfig;
use crate::store::{atomic_write, with_lock};
use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_STORE_NAME: &str = "default";

fn default_start_hour() -> u8 {
    9
}

fn default_check_interval() -> u64 {
    30
}

/// A named task file to monitor.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Hour used for reminders that name a day but no time (0-23).
    #[serde(default = "default_start_hour")]
    pub default_start_hour: u8,

    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// External command receiving the payload as JSON on stdin.
    /// Absent means desktop notifications.
    #[serde(default)]
    pub reminder_cmd: Option<String>,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub stores: Vec<StoreConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_start_hour: default_start_hour(),
            check_interval_secs: default_check_interval(),
            reminder_cmd: None,
            verbose: false,
            stores: Vec::new(),
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    /// Returns a contextualized error if reading or parsing fails.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(ctx: &dyn AppContext) -> Result<Self> {
        match Self::load(ctx) {
            Ok(config) => Ok(config),
            Err(e) if Self::is_missing_config_error(&e) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Helper to detect whether an anyhow::Error indicates that the config file was missing.
    /// Checks for the explicit "Config file not found" message, then for an
    /// IO NotFound anywhere in the error chain.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        for cause in err.chain() {
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>()
                && io_err.kind() == std::io::ErrorKind::NotFound
            {
                return true;
            }
        }

        false
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_start_hour > 23 {
            anyhow::bail!(
                "default_start_hour must be between 0 and 23 (got {})",
                self.default_start_hour
            );
        }
        if self.check_interval_secs == 0 {
            anyhow::bail!("check_interval_secs must be at least 1");
        }
        for (i, store) in self.stores.iter().enumerate() {
            if store.name.trim().is_empty() {
                anyhow::bail!("stores[{}] has an empty name", i);
            }
        }
        Ok(())
    }

    /// Save configuration using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            atomic_write(&path, toml_str)?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            default_start_hour: self.default_start_hour.min(23),
        }
    }

    /// Configured stores, or the single default store when none are listed.
    pub fn resolved_stores(&self, ctx: &dyn AppContext) -> Result<Vec<StoreConfig>> {
        if !self.stores.is_empty() {
            return Ok(self.stores.clone());
        }
        Ok(vec![StoreConfig {
            name: DEFAULT_STORE_NAME.to_string(),
            path: ctx.get_default_store_path()?,
        }])
    }

    /// Replaces the store list with plain paths given on the command line.
    /// Each store is named after its file stem.
    pub fn override_stores(&mut self, paths: &[PathBuf]) {
        self.stores = paths
            .iter()
            .map(|p| StoreConfig {
                name: p
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| p.display().to_string()),
                path: p.clone(),
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;

    #[test]
    fn test_missing_file_falls_back() {
        let ctx = TestContext::new();
        let err = Config::load(&ctx).unwrap_err();
        assert!(Config::is_missing_config_error(&err));
        assert_eq!(Config::load_or_default(&ctx).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let ctx = TestContext::new();
        let path = ctx.get_config_file_path().unwrap();
        fs::write(&path, "verbose = true\nreminder_cmd = \"/bin/hook\"\n").unwrap();

        let config = Config::load(&ctx).unwrap();
        assert!(config.verbose);
        assert_eq!(config.reminder_cmd.as_deref(), Some("/bin/hook"));
        assert_eq!(config.default_start_hour, 9);
        assert_eq!(config.check_interval_secs, 30);

        let stores = config.resolved_stores(&ctx).unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].name, DEFAULT_STORE_NAME);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let ctx = TestContext::new();
        let path = ctx.get_config_file_path().unwrap();
        fs::write(&path, "default_start_hour = 24\n").unwrap();
        let err = Config::load(&ctx).unwrap_err();
        assert!(!Config::is_missing_config_error(&err));

        fs::write(&path, "check_interval_secs = 0\n").unwrap();
        assert!(Config::load(&ctx).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let ctx = TestContext::new();
        let mut config = Config {
            default_start_hour: 7,
            ..Default::default()
        };
        config.override_stores(&[PathBuf::from("/tmp/work.json")]);
        config.save(&ctx).unwrap();

        let loaded = Config::load(&ctx).unwrap();
        assert_eq!(loaded.stores[0].name, "work");
        assert_eq!(loaded.parser_config().default_start_hour, 7);
    }
}
