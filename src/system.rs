//! Host system checks
//!
//! Root detection, prerequisite package lookups and version comparison used
//! by the launcher and the package control page.

use std::cmp::Ordering;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::command::{CommandArgs, run_command};
use crate::manifest::PackageRequirement;
use crate::types::PackageKind;

/// Check if running as root (EUID 0)
pub fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

/// `dpkg-query -W -f=${Version} <package>`
#[derive(Debug, Clone)]
pub struct DpkgQueryArgs {
    pub package: String,
}

impl CommandArgs for DpkgQueryArgs {
    fn program(&self) -> &'static str {
        "dpkg-query"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "-W".to_string(),
            "-f=${Version}".to_string(),
            self.package.clone(),
        ]
    }
}

/// Locate an executable on PATH
pub fn find_on_path(binary: &str) -> Option<PathBuf> {
    let explicit = Path::new(binary);
    if explicit.components().count() > 1 || explicit.is_absolute() {
        return is_executable_file(explicit).then(|| explicit.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable_file(candidate))
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
}

/// Compare dotted version strings component by component.
///
/// Components are split on `.`, `-`, `+`, `:` and `~`. Numeric components
/// compare numerically, others lexically; a missing component counts as 0.
pub fn compare_versions(installed: &str, required: &str) -> Ordering {
    fn components(v: &str) -> Vec<&str> {
        v.trim()
            .split(['.', '-', '+', ':', '~'])
            .filter(|c| !c.is_empty())
            .collect()
    }

    let a = components(installed);
    let b = components(required);
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or("0");
        let y = b.get(i).copied().unwrap_or("0");
        let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => x.cmp(y),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Looks up what is installed on the host
pub trait PackageProbe {
    /// Installed version, `Some("")` if present with unknown version, `None`
    /// if absent
    fn installed_version(&self, name: &str, kind: PackageKind) -> Option<String>;
}

/// Probe backed by `dpkg-query` and PATH
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl PackageProbe for SystemProbe {
    fn installed_version(&self, name: &str, kind: PackageKind) -> Option<String> {
        match kind {
            PackageKind::Deb => {
                let args = DpkgQueryArgs {
                    package: name.to_string(),
                };
                match run_command(&args) {
                    Ok(output) if output.success && !output.stdout.trim().is_empty() => {
                        Some(output.stdout.trim().to_string())
                    }
                    Ok(_) => None,
                    Err(e) => {
                        warn!("Cannot query package {}: {:#}", name, e);
                        None
                    }
                }
            }
            PackageKind::Bin => find_on_path(name).map(|_| String::new()),
        }
    }
}

/// Outcome of one prerequisite check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub installed: Option<String>,
    pub ok: bool,
}

impl CheckResult {
    /// Text for the value column of the package control page
    pub fn summary(&self, requirement: &PackageRequirement) -> String {
        match (&self.installed, self.ok) {
            (Some(v), true) if !v.is_empty() => v.clone(),
            (Some(_), true) => "installed".to_string(),
            (Some(v), false) => format!(
                "version {} does not satisfy {} {}",
                if v.is_empty() { "?" } else { v.as_str() },
                requirement.compare,
                requirement.ver
            ),
            (None, _) => "not installed".to_string(),
        }
    }
}

/// Check one prerequisite against the host.
///
/// An empty required version accepts any installed version. `bin`
/// requirements only check presence on PATH.
pub fn check_requirement(
    probe: &dyn PackageProbe,
    name: &str,
    requirement: &PackageRequirement,
) -> CheckResult {
    let installed = probe.installed_version(name, requirement.kind);
    let ok = match &installed {
        None => false,
        Some(_) if requirement.ver.trim().is_empty() => true,
        Some(_) if requirement.kind == PackageKind::Bin => {
            debug!("Version of binary {} is not checked", name);
            true
        }
        Some(version) => requirement
            .compare
            .accepts(compare_versions(version, &requirement.ver)),
    };
    debug!("Package {} installed={:?} ok={}", name, installed, ok);
    CheckResult {
        name: name.to_string(),
        installed,
        ok,
    }
}
