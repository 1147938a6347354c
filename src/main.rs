//! pkgwizard - main entry point
//!
//! Parses the command line, sets up the file log, checks privileges and runs
//! the install or uninstall wizard.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pkgwizard::cli::{Cli, Commands, SectionArgs};
use pkgwizard::config::WizardConfig;
use pkgwizard::dialog::message_box;
use pkgwizard::ledger::InstallLedger;
use pkgwizard::manifest::{Manifest, ProgramDescriptor};
use pkgwizard::scenario::StepStatus;
use pkgwizard::steps::{ActionRegistry, StepContext};
use pkgwizard::system::{SystemProbe, is_root};
use pkgwizard::wizard::pages::{
    add_package_control_page, add_program_install_page, add_program_uninstall_page,
    backend_factory,
};
use pkgwizard::wizard::{PageId, Wizard, WizardOutcome, WizardPage};

/// Initialize the file logger.
///
/// Nothing is logged unless `--log`/`--debug` is given or `RUST_LOG` is set;
/// the terminal belongs to the dialogs.
fn init_logger(config: &WizardConfig) -> Result<()> {
    let env_filter = std::env::var("RUST_LOG").ok().filter(|v| !v.is_empty());
    if !config.log && env_filter.is_none() {
        return Ok(());
    }

    fs::create_dir_all(&config.state_dir)
        .with_context(|| format!("Failed to create state directory {:?}", config.state_dir))?;
    let path = config.process_log_path();
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    let level = if config.debug { "debug" } else { "info" };
    let filter = match env_filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new(level),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false),
        )
        .with(filter)
        .init();
    Ok(())
}

fn build_config(cli: &Cli) -> Result<WizardConfig> {
    let base = if cli.state_dir.is_some() {
        WizardConfig::default()
    } else {
        WizardConfig::from_home()?
    };
    Ok(cli.apply_to(base))
}

/// Main application entry point
fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logger(&config) {
        eprintln!("✗ {:#}", e);
        return ExitCode::FAILURE;
    }
    info!("pkgwizard starting up");
    debug!("Configuration: {:?}", config);

    match run(&cli, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &WizardConfig) -> Result<bool> {
    match &cli.command {
        Commands::Installed => print_installed(config),
        Commands::Install { sections, .. } => {
            if !require_root(config) {
                return Ok(false);
            }
            run_install(config, sections)
        }
        Commands::Uninstall { sections } => {
            if !require_root(config) {
                return Ok(false);
            }
            run_uninstall(config, sections)
        }
    }
}

/// Installing and removing packages needs root; dry runs do not
fn require_root(config: &WizardConfig) -> bool {
    if is_root() || config.dry_run {
        return true;
    }
    error!("Not running as root");
    if let Err(e) = message_box(
        config.backend,
        "Root privileges are required.\nRun the wizard with sudo.",
        "Permission denied",
    ) {
        warn!("Cannot show message box: {}", e);
        eprintln!("✗ Root privileges are required");
    }
    false
}

fn print_installed(config: &WizardConfig) -> Result<bool> {
    let ledger = InstallLedger::new(config.install_log_path());
    let entries = ledger
        .entries()
        .with_context(|| format!("Failed to read install ledger {:?}", ledger.path()))?;
    if entries.is_empty() {
        println!("No packages installed");
    }
    for entry in entries {
        println!("{}\t{}", entry.name, entry.path);
    }
    Ok(true)
}

fn run_install(config: &WizardConfig, sections: &SectionArgs) -> Result<bool> {
    info!("Running install wizard with manifest {:?}", sections.manifest);
    let manifest = Manifest::load_from_file(&sections.manifest)?;
    let factory = backend_factory(config.backend);

    let mut wizard = Wizard::from_config(manifest.title_or("Install"), config);
    let checks_passed = if manifest.packages.is_empty() {
        true
    } else {
        add_package_control_page(&mut wizard, &manifest.packages, &SystemProbe, &factory)?.1
    };
    let actions = ActionRegistry::with_builtins(StepContext::from_config(config));
    let page = add_program_install_page(&mut wizard, manifest.programs.clone(), actions, &factory)?;
    apply_sections(&mut wizard, page, sections);

    let succeeded = finish(wizard.run()?)?;
    if !checks_passed {
        warn!("Prerequisite check failed; nothing was installed");
        eprintln!("✗ Prerequisite check failed");
        return Ok(false);
    }
    Ok(succeeded)
}

fn run_uninstall(config: &WizardConfig, sections: &SectionArgs) -> Result<bool> {
    info!("Running uninstall wizard");
    let programs = manifest_programs(&sections.manifest)?;
    let factory = backend_factory(config.backend);

    let mut wizard = Wizard::from_config("Uninstall", config);
    let ledger = InstallLedger::new(config.install_log_path());
    let actions = ActionRegistry::with_builtins(StepContext::from_config(config));
    let page = add_program_uninstall_page(&mut wizard, &ledger, &programs, actions, &factory)?;
    apply_sections(&mut wizard, page, sections);

    finish(wizard.run()?)
}

/// Descriptions for the uninstall list; a missing manifest only loses them
fn manifest_programs(path: &Path) -> Result<Vec<ProgramDescriptor>> {
    if !path.exists() {
        warn!("Manifest {:?} not found; listing ledger entries only", path);
        return Ok(Vec::new());
    }
    Ok(Manifest::load_from_file(path)?.programs)
}

fn apply_sections(wizard: &mut Wizard, id: PageId, sections: &SectionArgs) {
    let Some(page) = wizard.page_mut(id) else {
        return;
    };
    for section in &sections.check {
        page.check_section(section, true);
    }
    for section in &sections.uncheck {
        page.check_section(section, false);
    }
}

fn finish(outcome: WizardOutcome) -> Result<bool> {
    match outcome {
        WizardOutcome::Completed(report) => {
            for outcome in &report.outcomes {
                match &outcome.status {
                    StepStatus::Succeeded { changed: true } => println!("✓ {}", outcome.name),
                    StepStatus::Succeeded { changed: false } => {
                        println!("✓ {} (unchanged)", outcome.name)
                    }
                    StepStatus::Failed(reason) => eprintln!("✗ {}: {}", outcome.name, reason),
                    StepStatus::Skipped => debug!("Skipped {}", outcome.name),
                }
            }
            Ok(report.succeeded())
        }
        WizardOutcome::Cancelled => {
            info!("Wizard cancelled");
            Ok(false)
        }
        WizardOutcome::Empty => {
            warn!("Wizard has no pages");
            Ok(false)
        }
    }
}
