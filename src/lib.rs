//! pkgwizard library
//!
//! Building blocks for terminal install/uninstall wizards: a page-based
//! navigation engine, a deferred scenario of install steps, pluggable dialog
//! backends and the install ledger.

pub mod cli;
pub mod command;
pub mod config;
pub mod dialog;
pub mod error;
pub mod ledger;
pub mod manifest;
pub mod scenario;
pub mod steps;
pub mod system;
pub mod theme;
pub mod types;
pub mod wizard;

// Re-export main types for convenience
pub use config::{WizardConfig, WizardSettings};
pub use dialog::{DialogBackend, DialogContent, DialogOutcome, DialogSpec, create_dialog};
pub use error::{Result, WizardError};
pub use ledger::{InstallLedger, LedgerEntry, UninstallLog};
pub use manifest::{Manifest, PackageRequirement, ProgramDescriptor};
pub use scenario::{
    DryRunRunner, Scenario, ScenarioReport, ScenarioRunner, ScenarioStep, SequentialRunner,
    StepArgs, StepStatus,
};
pub use types::{BackendKind, NavCode};
pub use wizard::{ButtonSet, PageId, Wizard, WizardOutcome, WizardPage, WizardState};
