//! Install/uninstall package ledger
//!
//! The install ledger is a line-oriented text file, one entry per line:
//!
//! ```text
//! <package_name> ; <install_path>
//! ```
//!
//! Package names are unique. Every lookup re-reads the whole file; there is
//! no cache. The uninstall log is a separate append-only file that the
//! program never rewrites:
//!
//! ```text
//! <YYYY.MM.DD> ; <HH:MM:SS> : <package_name> : <install_path>
//! ```
//!
//! Read-modify-write sequences are not atomic. Two processes mutating the same
//! ledger can lose updates; the wizard is single-process and single-threaded.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Result, WizardError};

/// Field separator written between name and path
pub const FIELD_SEPARATOR: &str = " ; ";

/// One installed package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub name: String,
    pub path: String,
}

impl LedgerEntry {
    fn to_line(&self) -> String {
        format!("{}{}{}\n", self.name, FIELD_SEPARATOR, self.path)
    }

    fn parse(line: &str) -> Option<Self> {
        let (name, path) = line.split_once(';')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            path: path.trim().to_string(),
        })
    }
}

/// Reject values that would corrupt the line format
fn validate_field(what: &str, value: &str) -> Result<()> {
    if value.contains(';') || value.contains('\n') || value.contains('\r') {
        return Err(WizardError::validation(format!(
            "{} '{}' must not contain ';' or line breaks",
            what, value
        )));
    }
    Ok(())
}

/// Record of installed packages and their install paths
#[derive(Debug, Clone)]
pub struct InstallLedger {
    path: PathBuf,
}

impl InstallLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry in file order. A missing file is an empty ledger.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Install ledger {:?} not found", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(content.lines().filter_map(LedgerEntry::parse).collect())
    }

    /// Whether `name` (trimmed) has a recorded entry.
    ///
    /// Read errors are logged and reported as "not installed".
    pub fn is_installed(&self, name: &str) -> bool {
        let name = name.trim();
        match self.entries() {
            Ok(entries) => entries.iter().any(|e| e.name == name),
            Err(e) => {
                warn!("Failed to read install ledger {:?}: {}", self.path, e);
                false
            }
        }
    }

    /// Install path recorded for `name`, or `None` if absent or unreadable
    pub fn path_of(&self, name: &str) -> Option<String> {
        let name = name.trim();
        match self.entries() {
            Ok(entries) => entries.into_iter().find(|e| e.name == name).map(|e| e.path),
            Err(e) => {
                warn!("Failed to read install ledger {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// Append an entry, creating the ledger file and its directory if needed.
    ///
    /// Fails with `DuplicatePackage` if the name is already recorded.
    pub fn record_install(&self, name: &str, path: &str) -> Result<()> {
        let entry = LedgerEntry {
            name: name.trim().to_string(),
            path: path.trim().to_string(),
        };
        if entry.name.is_empty() {
            return Err(WizardError::validation("package name must not be empty"));
        }
        validate_field("package name", &entry.name)?;
        validate_field("install path", &entry.path)?;

        if self.entries()?.iter().any(|e| e.name == entry.name) {
            return Err(WizardError::DuplicatePackage(entry.name));
        }

        ensure_parent_dir(&self.path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.to_line().as_bytes())?;
        info!("Recorded install of {} at {}", entry.name, entry.path);
        Ok(())
    }

    /// Delete the entry for `name` and rewrite the file.
    ///
    /// Returns `Ok(false)` if the ledger or the name does not exist. Errors
    /// while rewriting are propagated.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        if !self.path.exists() {
            warn!("Install ledger {:?} not found", self.path);
            return Ok(false);
        }
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|e| e.name != name);
        if entries.len() == before {
            return Ok(false);
        }
        self.rewrite(&entries)?;
        info!("Removed {} from install ledger", name);
        Ok(true)
    }

    fn rewrite(&self, entries: &[LedgerEntry]) -> Result<()> {
        let content: String = entries.iter().map(LedgerEntry::to_line).collect();
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Append-only log of uninstalled packages
#[derive(Debug, Clone)]
pub struct UninstallLog {
    path: PathBuf,
}

impl UninstallLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uninstall log placed next to an install ledger
    pub fn beside(ledger: &InstallLedger) -> Self {
        let dir = ledger.path().parent().unwrap_or_else(|| Path::new(""));
        Self::new(dir.join(crate::config::UNINSTALL_LOG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a timestamped uninstall event
    pub fn record(&self, name: &str, path: &str) -> Result<()> {
        let now = Local::now();
        let line = format!(
            "{} ; {} : {} : {}\n",
            now.format("%Y.%m.%d"),
            now.format("%H:%M:%S"),
            name.trim(),
            path.trim()
        );
        ensure_parent_dir(&self.path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            info!("Created directory {:?}", parent);
        }
    }
    Ok(())
}
