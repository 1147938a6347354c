//! Configuration management module
//!
//! `WizardConfig` is built once by the launcher and threaded through
//! constructors. `ConfigView` offers string lookups for code that still
//! thinks in terms of named variables. `WizardSettings` is the per-page state
//! that survives between runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::BackendKind;

/// Directory under `$HOME` holding the ledgers, settings and log file
pub const STATE_DIR_NAME: &str = ".pkgwizard";
/// Install ledger file name
pub const INSTALL_LOG_FILE_NAME: &str = "install.log";
/// Uninstall event log file name
pub const UNINSTALL_LOG_FILE_NAME: &str = "uninstall.log";
/// Persisted page settings file name
pub const SETTINGS_FILE_NAME: &str = "wizard.json";
/// Process log file name
pub const PROCESS_LOG_FILE_NAME: &str = "pkgwizard.log";
/// Where package archives are looked up when no directory is given
pub const DEFAULT_PACKAGES_DIR: &str = "packages";

/// Process-wide wizard configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardConfig {
    /// Active dialog backend
    pub backend: BackendKind,
    /// Debug mode: verbose logging, scenario stops on the first failed step
    pub debug: bool,
    /// Write the process log
    pub log: bool,
    /// Log scenario steps instead of running them
    pub dry_run: bool,
    /// Directory for ledgers, settings and the process log
    pub state_dir: PathBuf,
    /// Directory containing package archives
    pub packages_dir: PathBuf,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            debug: false,
            log: false,
            dry_run: false,
            state_dir: PathBuf::from(STATE_DIR_NAME),
            packages_dir: PathBuf::from(DEFAULT_PACKAGES_DIR),
        }
    }
}

impl WizardConfig {
    /// Configuration rooted at `$HOME/.pkgwizard`
    pub fn from_home() -> Result<Self> {
        Ok(Self {
            state_dir: default_state_dir()?,
            ..Self::default()
        })
    }

    pub fn install_log_path(&self) -> PathBuf {
        self.state_dir.join(INSTALL_LOG_FILE_NAME)
    }

    pub fn uninstall_log_path(&self) -> PathBuf {
        self.state_dir.join(UNINSTALL_LOG_FILE_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.state_dir.join(SETTINGS_FILE_NAME)
    }

    pub fn process_log_path(&self) -> PathBuf {
        self.state_dir.join(PROCESS_LOG_FILE_NAME)
    }

    /// Read-only view for lookups by variable name
    pub fn view(&self) -> ConfigView<'_> {
        ConfigView { config: self }
    }
}

/// `$HOME/.pkgwizard`
pub fn default_state_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set; cannot resolve state directory")?;
    Ok(PathBuf::from(home).join(STATE_DIR_NAME))
}

/// Read-only lookup of configuration values by their legacy variable names.
///
/// Unknown keys yield `None`; there is no setter.
#[derive(Debug, Clone, Copy)]
pub struct ConfigView<'a> {
    config: &'a WizardConfig,
}

impl ConfigView<'_> {
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "DIALOG_MODE" => Some(self.config.backend.to_string()),
            "DEBUG_MODE" => Some(self.config.debug.to_string()),
            "LOG_MODE" => Some(self.config.log.to_string()),
            "DRY_RUN" => Some(self.config.dry_run.to_string()),
            _ => None,
        }
    }
}

/// Page settings persisted between runs, keyed by page settings key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardSettings {
    #[serde(default)]
    pub pages: BTreeMap<String, Value>,
}

impl WizardSettings {
    /// Load settings, returning empty settings if the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Load settings from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;
        let settings: Self =
            serde_json::from_str(&content).context("Failed to parse settings JSON")?;
        Ok(settings)
    }

    /// Save settings to a JSON file, creating the parent directory
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize settings to JSON")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write settings to {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.pages.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.pages.insert(key.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_config_paths_live_in_state_dir() {
        let config = WizardConfig {
            state_dir: PathBuf::from("/tmp/state"),
            ..WizardConfig::default()
        };
        assert_eq!(config.install_log_path(), PathBuf::from("/tmp/state/install.log"));
        assert_eq!(
            config.uninstall_log_path(),
            PathBuf::from("/tmp/state/uninstall.log")
        );
        assert_eq!(config.settings_path(), PathBuf::from("/tmp/state/wizard.json"));
    }

    #[test]
    fn test_config_view_lookup() {
        let config = WizardConfig {
            backend: BackendKind::Dialog,
            debug: true,
            ..WizardConfig::default()
        };
        let view = config.view();
        assert_eq!(view.get("DIALOG_MODE").as_deref(), Some("dialog"));
        assert_eq!(view.get("DEBUG_MODE").as_deref(), Some("true"));
        assert_eq!(view.get("LOG_MODE").as_deref(), Some("false"));
        assert_eq!(view.get("NO_SUCH_KEY"), None);
    }

    #[test]
    fn test_settings_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let settings = WizardSettings::load_or_default(dir.path().join("wizard.json")).unwrap();
        assert!(settings.pages.is_empty());
    }

    #[test]
    fn test_settings_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("wizard.json");

        let mut settings = WizardSettings::default();
        settings.set("programs", json!({ "checked": ["editor"] }));
        settings.save_to_file(&path).unwrap();

        let loaded = WizardSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.get("programs"), Some(&json!({ "checked": ["editor"] })));
    }

    #[test]
    fn test_settings_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wizard.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(WizardSettings::load_from_file(&path).is_err());
    }
}
