//! Wizard navigation engine and the installer pages built on it

pub mod engine;
pub mod page;
pub mod pages;

pub use engine::{Wizard, WizardOutcome, WizardState};
pub use page::{ButtonSet, PageId, WizardPage};
