//! Built-in scenario actions
//!
//! A program descriptor's `script` field names the action its scenario step
//! runs. Two actions are built in:
//!
//! - `install`: unpack or install the package archive and record it in the
//!   install ledger
//! - `uninstall`: remove the installed files and move the entry from the
//!   install ledger to the uninstall log
//!
//! The descriptor travels to the action as the step's keyword arguments.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::command::{CommandArgs, run_command};
use crate::config::WizardConfig;
use crate::ledger::{InstallLedger, UninstallLog};
use crate::manifest::ProgramDescriptor;
use crate::scenario::{StepAction, StepArgs, step_action};

pub const INSTALL_ACTION: &str = "install";
pub const UNINSTALL_ACTION: &str = "uninstall";

/// `tar -xzf <archive> -C <dest>`
#[derive(Debug, Clone)]
pub struct TarExtractArgs {
    pub archive: PathBuf,
    pub dest: PathBuf,
    pub verbose: bool,
}

impl CommandArgs for TarExtractArgs {
    fn program(&self) -> &'static str {
        "tar"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.verbose {
            args.push("-v".to_string());
        }
        args.push("-xzf".to_string());
        args.push(self.archive.display().to_string());
        args.push("-C".to_string());
        args.push(self.dest.display().to_string());
        args
    }
}

/// `unzip -o <archive> -d <dest>`
#[derive(Debug, Clone)]
pub struct UnzipArgs {
    pub archive: PathBuf,
    pub dest: PathBuf,
    pub quiet: bool,
}

impl CommandArgs for UnzipArgs {
    fn program(&self) -> &'static str {
        "unzip"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["-o".to_string()];
        if self.quiet {
            args.push("-q".to_string());
        }
        args.push(self.archive.display().to_string());
        args.push("-d".to_string());
        args.push(self.dest.display().to_string());
        args
    }
}

/// `dpkg -i <archive>`
#[derive(Debug, Clone)]
pub struct DpkgInstallArgs {
    pub archive: PathBuf,
}

impl CommandArgs for DpkgInstallArgs {
    fn program(&self) -> &'static str {
        "dpkg"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-i".to_string(), self.archive.display().to_string()]
    }
}

/// `dpkg --remove <package>`
#[derive(Debug, Clone)]
pub struct DpkgRemoveArgs {
    pub package: String,
}

impl CommandArgs for DpkgRemoveArgs {
    fn program(&self) -> &'static str {
        "dpkg"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["--remove".to_string(), self.package.clone()]
    }
}

/// Package archive formats recognised by file suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    Deb,
}

impl ArchiveKind {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".deb") {
            Some(Self::Deb)
        } else {
            None
        }
    }
}

/// Ledgers and directories the built-in actions work with
#[derive(Debug, Clone)]
pub struct StepContext {
    pub ledger: InstallLedger,
    pub uninstall_log: UninstallLog,
    /// Directory holding package archives
    pub packages_dir: PathBuf,
}

impl StepContext {
    pub fn new(ledger: InstallLedger, packages_dir: impl Into<PathBuf>) -> Self {
        let uninstall_log = UninstallLog::beside(&ledger);
        Self {
            ledger,
            uninstall_log,
            packages_dir: packages_dir.into(),
        }
    }

    pub fn from_config(config: &WizardConfig) -> Self {
        Self {
            ledger: InstallLedger::new(config.install_log_path()),
            uninstall_log: UninstallLog::new(config.uninstall_log_path()),
            packages_dir: config.packages_dir.clone(),
        }
    }
}

/// Step arguments carrying a descriptor as keyword arguments
pub fn descriptor_args(descriptor: &ProgramDescriptor) -> StepArgs {
    let keyword = match serde_json::to_value(descriptor) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => serde_json::Map::new(),
    };
    StepArgs {
        positional: Vec::new(),
        keyword,
    }
}

/// Rebuild the descriptor from step keyword arguments
pub fn descriptor_from_args(args: &StepArgs) -> Result<ProgramDescriptor> {
    serde_json::from_value(Value::Object(args.keyword.clone()))
        .context("Step arguments are not a program descriptor")
}

fn resolve_install_dir(descriptor: &ProgramDescriptor, id: &str) -> PathBuf {
    match descriptor.dir.as_deref() {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        _ => {
            let dir = std::env::temp_dir().join(id);
            warn!("No install directory for <{}>; using {:?}", id, dir);
            dir
        }
    }
}

/// Install one program and record it in the ledger.
///
/// Returns `Ok(false)` if the ledger already lists the program.
pub fn install_program(ctx: &StepContext, descriptor: &ProgramDescriptor) -> Result<bool> {
    let Some(id) = descriptor.identifier() else {
        bail!("program descriptor has neither 'programm' nor 'name'");
    };

    if ctx.ledger.is_installed(id) {
        info!("<{}> is already installed; skipping", id);
        return Ok(false);
    }
    info!("Installing <{}>", id);

    let install_dir = resolve_install_dir(descriptor, id);
    if !install_dir.exists() {
        fs::create_dir_all(&install_dir)
            .with_context(|| format!("Failed to create install directory {:?}", install_dir))?;
        info!("Created install directory {:?}", install_dir);
    }

    let mut ledger_path = install_dir.display().to_string();
    if let Some(sub) = descriptor.package_dir.as_deref() {
        let package_dir = install_dir.join(sub);
        if package_dir.exists() {
            info!("Removing previous package directory {:?}", package_dir);
            fs::remove_dir_all(&package_dir)
                .with_context(|| format!("Failed to remove {:?}", package_dir))?;
        }
        ledger_path = package_dir.display().to_string();
    }

    match descriptor.programm.as_deref() {
        None => warn!("<{}> has no package archive; recording directory only", id),
        Some(archive) => {
            let archive_path = ctx.packages_dir.join(archive);
            match ArchiveKind::from_file_name(archive) {
                Some(ArchiveKind::Zip) => {
                    let args = UnzipArgs {
                        archive: archive_path,
                        dest: install_dir.clone(),
                        quiet: !descriptor.console(),
                    };
                    run_command(&args)?.ensure_success("unzip")?;
                }
                Some(ArchiveKind::TarGz) => {
                    let args = TarExtractArgs {
                        archive: archive_path,
                        dest: install_dir.clone(),
                        verbose: descriptor.console(),
                    };
                    run_command(&args)?.ensure_success("tar")?;
                }
                Some(ArchiveKind::Deb) => {
                    let args = DpkgInstallArgs {
                        archive: archive_path,
                    };
                    run_command(&args)?.ensure_success("dpkg -i")?;
                    // dpkg packages are removed by package name, not by path
                    ledger_path = descriptor
                        .name
                        .clone()
                        .unwrap_or_else(|| deb_package_name(archive));
                }
                None => bail!("unsupported package archive <{}>", archive),
            }
        }
    }

    ctx.ledger
        .record_install(id, &ledger_path)
        .with_context(|| format!("Failed to record install of <{}>", id))?;
    Ok(true)
}

/// `editor_2.1_amd64.deb` → `editor`
fn deb_package_name(archive: &str) -> String {
    let file = Path::new(archive)
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| archive.to_string());
    let stem = file.strip_suffix(".deb").unwrap_or(&file);
    stem.split('_').next().unwrap_or(stem).to_string()
}

/// Uninstall one program recorded in the ledger.
///
/// Returns `Ok(false)` if the ledger does not list it.
pub fn uninstall_program(ctx: &StepContext, descriptor: &ProgramDescriptor) -> Result<bool> {
    let Some(id) = descriptor.identifier() else {
        bail!("program descriptor has neither 'programm' nor 'name'");
    };

    let Some(path) = ctx.ledger.path_of(id) else {
        warn!("<{}> is not in the install ledger", id);
        return Ok(false);
    };

    if ArchiveKind::from_file_name(id) == Some(ArchiveKind::Deb) {
        let args = DpkgRemoveArgs {
            package: path.clone(),
        };
        run_command(&args)?.ensure_success("dpkg --remove")?;
    } else {
        let target = Path::new(&path);
        if target.is_dir() {
            fs::remove_dir_all(target)
                .with_context(|| format!("Failed to remove directory {:?}", target))?;
        } else if target.exists() {
            fs::remove_file(target)
                .with_context(|| format!("Failed to remove file {:?}", target))?;
        } else {
            debug!("{:?} is already gone", target);
        }
    }

    // Drop the entry only after the files are gone
    if !ctx.ledger.remove(id)? {
        warn!("<{}> left the install ledger during uninstall", id);
    }
    ctx.uninstall_log
        .record(id, &path)
        .with_context(|| format!("Failed to log uninstall of <{}>", id))?;
    info!("Uninstalled <{}> from {}", id, path);
    Ok(true)
}

/// Maps `script` names to step actions
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, StepAction>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `install` and `uninstall` bound to `ctx`
    pub fn with_builtins(ctx: StepContext) -> Self {
        let ctx = Arc::new(ctx);
        let mut registry = Self::new();

        let install_ctx = Arc::clone(&ctx);
        registry.register(
            INSTALL_ACTION,
            step_action(move |args| {
                let descriptor = descriptor_from_args(args)?;
                install_program(&install_ctx, &descriptor)
            }),
        );

        let uninstall_ctx = Arc::clone(&ctx);
        registry.register(
            UNINSTALL_ACTION,
            step_action(move |args| {
                let descriptor = descriptor_from_args(args)?;
                uninstall_program(&uninstall_ctx, &descriptor)
            }),
        );
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, action: StepAction) {
        self.actions.insert(name.into(), action);
    }

    /// Action for a descriptor's `script`. Unknown names log a warning.
    pub fn resolve(&self, script: Option<&str>) -> Option<StepAction> {
        let name = script?.trim();
        let action = self.actions.get(name).cloned();
        if action.is_none() {
            warn!("Unknown scenario action <{}>", name);
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        ctx: StepContext,
        root: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        let packages = root.join("packages");
        fs::create_dir_all(&packages).unwrap();
        let ledger = InstallLedger::new(root.join("state").join("install.log"));
        Fixture {
            ctx: StepContext::new(ledger, packages),
            root,
            _dir: dir,
        }
    }

    /// Build packages/<name> as a tar.gz containing hello.txt
    fn make_tarball(fx: &Fixture, name: &str) {
        let src = fx.root.join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("hello.txt"), "hello").unwrap();
        let status = Command::new("tar")
            .arg("-czf")
            .arg(fx.ctx.packages_dir.join(name))
            .arg("-C")
            .arg(&src)
            .arg("hello.txt")
            .status()
            .unwrap();
        assert!(status.success());
    }

    fn descriptor(programm: &str, dir: &Path) -> ProgramDescriptor {
        ProgramDescriptor {
            name: Some("editor".into()),
            programm: Some(programm.into()),
            dir: Some(dir.display().to_string()),
            script: Some(INSTALL_ACTION.into()),
            ..ProgramDescriptor::default()
        }
    }

    #[test]
    fn test_archive_kind() {
        assert_eq!(ArchiveKind::from_file_name("a.ZIP"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_file_name("a.tar.gz"), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_file_name("a_1.0.deb"), Some(ArchiveKind::Deb));
        assert_eq!(ArchiveKind::from_file_name("a.tar.xz"), None);
    }

    #[test]
    fn test_command_args() {
        let tar = TarExtractArgs {
            archive: "/p/a.tar.gz".into(),
            dest: "/opt/a".into(),
            verbose: false,
        };
        assert_eq!(tar.to_cli_args(), ["-xzf", "/p/a.tar.gz", "-C", "/opt/a"]);
        let unzip = UnzipArgs {
            archive: "/p/a.zip".into(),
            dest: "/opt/a".into(),
            quiet: true,
        };
        assert_eq!(unzip.to_cli_args(), ["-o", "-q", "/p/a.zip", "-d", "/opt/a"]);
        let remove = DpkgRemoveArgs {
            package: "editor".into(),
        };
        assert_eq!(remove.to_cli_args(), ["--remove", "editor"]);
    }

    #[test]
    fn test_deb_package_name() {
        assert_eq!(deb_package_name("editor_2.1_amd64.deb"), "editor");
        assert_eq!(deb_package_name("dir/viewer.deb"), "viewer");
    }

    #[test]
    fn test_install_then_uninstall_tarball() {
        let fx = fixture();
        make_tarball(&fx, "editor.tar.gz");
        let install_dir = fx.root.join("opt").join("editor");
        let desc = descriptor("editor.tar.gz", &install_dir);

        assert!(install_program(&fx.ctx, &desc).unwrap());
        assert_eq!(fs::read_to_string(install_dir.join("hello.txt")).unwrap(), "hello");
        assert_eq!(
            fx.ctx.ledger.path_of("editor.tar.gz"),
            Some(install_dir.display().to_string())
        );

        // Second install is a no-op
        assert!(!install_program(&fx.ctx, &desc).unwrap());

        assert!(uninstall_program(&fx.ctx, &desc).unwrap());
        assert!(!install_dir.exists());
        assert!(!fx.ctx.ledger.is_installed("editor.tar.gz"));
        let log = fs::read_to_string(fx.ctx.uninstall_log.path()).unwrap();
        assert!(log.contains(" : editor.tar.gz : "));

        assert!(!uninstall_program(&fx.ctx, &desc).unwrap());
    }

    #[test]
    fn test_failed_removal_keeps_ledger_entry() {
        let locked = Path::new("/proc/sys/kernel");
        if !locked.is_dir() {
            return;
        }
        let fx = fixture();
        fx.ctx
            .ledger
            .record_install("tool.tar.gz", &locked.display().to_string())
            .unwrap();
        let desc = descriptor("tool.tar.gz", locked);

        assert!(uninstall_program(&fx.ctx, &desc).is_err());
        assert!(fx.ctx.ledger.is_installed("tool.tar.gz"));
        assert!(!fx.ctx.uninstall_log.path().exists());
    }

    #[test]
    fn test_package_dir_is_replaced_and_recorded() {
        let fx = fixture();
        make_tarball(&fx, "editor.tar.gz");
        let install_dir = fx.root.join("opt");
        let stale = install_dir.join("editor-pkg");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("old.txt"), "old").unwrap();

        let mut desc = descriptor("editor.tar.gz", &install_dir);
        desc.package_dir = Some("editor-pkg".into());
        assert!(install_program(&fx.ctx, &desc).unwrap());
        assert!(!stale.join("old.txt").exists());
        assert_eq!(
            fx.ctx.ledger.path_of("editor.tar.gz"),
            Some(stale.display().to_string())
        );
    }

    #[test]
    fn test_missing_archive_fails_without_recording() {
        let fx = fixture();
        let desc = descriptor("absent.tar.gz", &fx.root.join("opt"));
        assert!(install_program(&fx.ctx, &desc).is_err());
        assert!(!fx.ctx.ledger.is_installed("absent.tar.gz"));
    }

    #[test]
    fn test_unsupported_archive_fails() {
        let fx = fixture();
        let desc = descriptor("editor.rar", &fx.root.join("opt"));
        let err = install_program(&fx.ctx, &desc).unwrap_err();
        assert!(err.to_string().contains("unsupported package archive"));
    }

    #[test]
    fn test_registry_resolves_builtins() {
        let fx = fixture();
        make_tarball(&fx, "editor.tar.gz");
        let install_dir = fx.root.join("opt").join("editor");
        let desc = descriptor("editor.tar.gz", &install_dir);

        let registry = ActionRegistry::with_builtins(fx.ctx.clone());
        assert!(registry.resolve(Some("nonexistent")).is_none());
        assert!(registry.resolve(None).is_none());

        let install = registry.resolve(desc.script.as_deref()).unwrap();
        assert!(install(&descriptor_args(&desc)).unwrap());
        let uninstall = registry.resolve(Some(UNINSTALL_ACTION)).unwrap();
        assert!(uninstall(&descriptor_args(&desc)).unwrap());
    }

    #[test]
    fn test_descriptor_args_round_trip() {
        let desc = descriptor("editor.tar.gz", Path::new("/opt/editor"));
        let args = descriptor_args(&desc);
        assert_eq!(args.keyword_str("programm"), Some("editor.tar.gz"));
        assert_eq!(descriptor_from_args(&args).unwrap(), desc);
    }
}
