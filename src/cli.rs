use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::WizardConfig;
use crate::types::BackendKind;

/// pkgwizard - install and uninstall software packages from a manifest
#[derive(Parser, Debug)]
#[command(name = "pkgwizard")]
#[command(about = "Interactive installer wizard for packaged Linux software")]
#[command(version)]
pub struct Cli {
    /// Debug mode: verbose log, stop the scenario at the first failed step
    #[arg(short = 'D', long, global = true)]
    pub debug: bool,

    /// Write the process log to the state directory
    #[arg(short = 'L', long, global = true)]
    pub log: bool,

    /// Dialog backend
    #[arg(long, value_enum, default_value_t = BackendKind::Tui, global = true)]
    pub backend: BackendKind,

    /// Dry-run mode: log the scenario steps without running them.
    ///
    /// Dialogs are still shown and settings are still saved; no archive is
    /// unpacked and no ledger is touched.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Directory for ledgers, settings and the log (default: ~/.pkgwizard)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Section overrides shared by install and uninstall
#[derive(Args, Debug, Clone, Default)]
pub struct SectionArgs {
    /// Path to the install manifest (JSON)
    #[arg(short, long, default_value = "manifest.json")]
    pub manifest: PathBuf,

    /// Check a program section (index or name); may be repeated
    #[arg(long = "check", value_name = "SECTION")]
    pub check: Vec<String>,

    /// Uncheck a program section (index or name); may be repeated
    #[arg(long = "uncheck", value_name = "SECTION")]
    pub uncheck: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the install wizard
    Install {
        #[command(flatten)]
        sections: SectionArgs,

        /// Directory containing the package archives
        #[arg(long)]
        packages_dir: Option<PathBuf>,
    },
    /// Run the uninstall wizard
    Uninstall {
        #[command(flatten)]
        sections: SectionArgs,
    },
    /// Print the install ledger
    Installed,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn sections(&self) -> Option<&SectionArgs> {
        match &self.command {
            Commands::Install { sections, .. } | Commands::Uninstall { sections } => {
                Some(sections)
            }
            Commands::Installed => None,
        }
    }

    /// Overlay the command-line flags on `config`
    pub fn apply_to(&self, mut config: WizardConfig) -> WizardConfig {
        config.backend = self.backend;
        config.debug = self.debug;
        config.log = self.log || self.debug;
        config.dry_run = self.dry_run;
        if let Some(dir) = &self.state_dir {
            config.state_dir = dir.clone();
        }
        if let Commands::Install {
            packages_dir: Some(dir),
            ..
        } = &self.command
        {
            config.packages_dir = dir.clone();
        }
        config
    }
}
