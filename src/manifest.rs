//! Install manifest
//!
//! The manifest is the JSON document an installer ships next to its package
//! archives. It names the prerequisite packages to check and the programs
//! offered for installation:
//!
//! ```json
//! {
//!   "title": "Office suite",
//!   "packages": {
//!     "tar": { "kind": "deb", "ver": "1.30", "compare": ">=" }
//!   },
//!   "programs": [
//!     { "name": "editor", "programm": "editor-2.1.tar.gz",
//!       "description": "Text editor", "dir": "/opt/editor",
//!       "script": "install", "check": true }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::WizardError;
use crate::types::{PackageKind, VersionCompare};

/// Prerequisite package check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRequirement {
    #[serde(default)]
    pub kind: PackageKind,
    /// Required version; empty means any version
    #[serde(default)]
    pub ver: String,
    #[serde(default)]
    pub compare: VersionCompare,
}

/// One installable program.
///
/// Every field is optional; accessors supply the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDescriptor {
    /// Display name; also the section name for `check_section`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Package archive file name (`.zip`, `.tar.gz` or `.deb`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Install directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Name of the step action (`install`, `uninstall`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Initially checked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<bool>,
    /// Subdirectory of `dir` the archive unpacks into; replaced on install
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_dir: Option<String>,
    /// Show extraction tool output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<bool>,
}

impl ProgramDescriptor {
    /// Name shown in dialogs: name, then programm, then "-"
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.programm.as_deref())
            .unwrap_or("-")
    }

    /// Name recorded in the install ledger: programm, then name
    pub fn identifier(&self) -> Option<&str> {
        self.programm.as_deref().or(self.name.as_deref())
    }

    /// Description shown in dialogs, falling back to the archive name
    pub fn display_description(&self) -> &str {
        self.description
            .as_deref()
            .or(self.programm.as_deref())
            .unwrap_or("-")
    }

    pub fn is_checked(&self, default: bool) -> bool {
        self.check.unwrap_or(default)
    }

    pub fn console(&self) -> bool {
        self.console.unwrap_or(true)
    }
}

/// Installer manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub packages: BTreeMap<String, PackageRequirement>,
    #[serde(default)]
    pub programs: Vec<ProgramDescriptor>,
}

impl Manifest {
    /// Load a manifest from a JSON file and validate it
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest from {:?}", path.as_ref()))?;
        let manifest: Self =
            serde_json::from_str(&content).context("Failed to parse manifest JSON")?;
        manifest
            .validate()
            .with_context(|| format!("Invalid manifest {:?}", path.as_ref()))?;
        Ok(manifest)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize manifest to JSON")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write manifest to {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), WizardError> {
        if self.programs.is_empty() {
            return Err(WizardError::config("manifest lists no programs"));
        }
        for (i, program) in self.programs.iter().enumerate() {
            if program.identifier().is_none() {
                return Err(WizardError::config(format!(
                    "program #{} has neither 'name' nor 'programm'",
                    i
                )));
            }
        }
        Ok(())
    }

    /// Window title, falling back to `default`
    pub fn title_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.title.trim().is_empty() {
            default
        } else {
            &self.title
        }
    }
}

/// Check or uncheck one program section before the wizard starts.
///
/// `section` is a zero-based index or a program name. Returns false (with a
/// warning) if no section matches.
pub fn check_section(programs: &mut [ProgramDescriptor], section: &str, check: bool) -> bool {
    let index = match section.trim().parse::<usize>() {
        Ok(i) if i < programs.len() => Some(i),
        Ok(_) => None,
        Err(_) => programs
            .iter()
            .position(|p| p.name.as_deref() == Some(section.trim())),
    };

    let Some(index) = index else {
        warn!("Unknown program section <{}>", section);
        return false;
    };

    let program = &mut programs[index];
    program.check = Some(check);
    info!(
        "[{}] section <{}>",
        if check { "v" } else { " " },
        program.description.as_deref().unwrap_or(program.display_name())
    );
    true
}
