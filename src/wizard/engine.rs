//! Wizard navigation engine
//!
//! Owns the page arena and the scenario. Pages are appended during setup;
//! `run` then walks them with the operator:
//!
//! ```text
//! Idle
//!   ↓ run (no pages → Empty)
//! Active(first)
//!   ├─ NEXT   → confirm forward, Active(next)   (no next → Finished)
//!   ├─ PREV   → unconfirm previous, Active(previous) (no previous → same page)
//!   ├─ FINISH → confirm forward, Finished
//!   └─ CANCEL → Cancelled
//! Finished → save settings, run scenario
//! ```

use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::page::{ButtonSet, PageId, WizardPage};
use crate::config::{WizardConfig, WizardSettings};
use crate::dialog::Button;
use crate::error::{Result, WizardError};
use crate::scenario::{DryRunRunner, Scenario, ScenarioReport, ScenarioRunner, SequentialRunner};
use crate::types::NavCode;

/// Where the wizard is in its life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    /// Pages may still be appended
    Idle,
    /// The given page is on screen
    Active(PageId),
    Finished,
    Cancelled,
}

impl WizardState {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Not started",
            Self::Active(_) => "Page active",
            Self::Finished => "Finished",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active(id) => write!(f, "{} ({})", self.description(), id),
            _ => write!(f, "{}", self.description()),
        }
    }
}

/// How a wizard run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardOutcome {
    /// Operator finished; the scenario ran and produced this report
    Completed(ScenarioReport),
    /// Operator cancelled; nothing ran
    Cancelled,
    /// The wizard had no pages
    Empty,
}

impl WizardOutcome {
    pub fn succeeded(&self) -> bool {
        match self {
            Self::Completed(report) => report.succeeded(),
            Self::Cancelled | Self::Empty => false,
        }
    }
}

/// Multi-page wizard
pub struct Wizard {
    title: String,
    pages: Vec<Box<dyn WizardPage>>,
    scenario: Scenario,
    state: WizardState,
    runner: Box<dyn ScenarioRunner>,
    settings: WizardSettings,
    settings_path: Option<PathBuf>,
}

impl Wizard {
    /// Wizard with the sequential runner and no persisted settings
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: Vec::new(),
            scenario: Scenario::new(),
            state: WizardState::Idle,
            runner: Box::new(SequentialRunner::default()),
            settings: WizardSettings::default(),
            settings_path: None,
        }
    }

    /// Wizard configured from the process configuration.
    ///
    /// Picks the runner from `dry_run`/`debug` and loads page settings from
    /// the state directory. Unreadable settings are logged and ignored.
    pub fn from_config(title: impl Into<String>, config: &WizardConfig) -> Self {
        let mut wizard = Self::new(title);
        if config.dry_run {
            wizard.set_runner(Box::new(DryRunRunner));
        } else {
            wizard.set_runner(Box::new(SequentialRunner::new(config.debug)));
        }

        let path = config.settings_path();
        wizard.settings = match WizardSettings::load_or_default(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring wizard settings {:?}: {:#}", path, e);
                WizardSettings::default()
            }
        };
        wizard.settings_path = Some(path);
        wizard
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn settings(&self) -> &WizardSettings {
        &self.settings
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, id: PageId) -> Option<&dyn WizardPage> {
        self.pages.get(id.0).map(|p| p.as_ref())
    }

    pub fn page_mut(&mut self, id: PageId) -> Option<&mut Box<dyn WizardPage>> {
        self.pages.get_mut(id.0)
    }

    /// Replace the scenario runner
    pub fn set_runner(&mut self, runner: Box<dyn ScenarioRunner>) {
        self.runner = runner;
    }

    /// Append a page and recompute every page's buttons.
    ///
    /// Persisted settings under the page's key are restored first. Fails once
    /// `run` has started.
    pub fn append_page(&mut self, mut page: Box<dyn WizardPage>) -> Result<PageId> {
        if self.state != WizardState::Idle {
            return Err(WizardError::state(format!(
                "cannot append page '{}' to a wizard in state: {}",
                page.title(),
                self.state
            )));
        }

        if let Some(value) = page.settings_key().and_then(|key| self.settings.get(key)) {
            let value = value.clone();
            page.restore_settings(&value);
        }

        let id = PageId(self.pages.len());
        debug!("Appending wizard {} '{}'", id, page.title());
        self.pages.push(page);
        self.refresh_buttons();
        Ok(id)
    }

    /// Button set the page at `id` shows
    pub fn button_set(&self, id: PageId) -> Option<ButtonSet> {
        if id.0 >= self.pages.len() {
            return None;
        }
        Some(ButtonSet::from_links(
            self.has_prev(id.0),
            self.has_next(id.0),
        ))
    }

    pub fn buttons_for(&self, id: PageId) -> Option<Vec<Button>> {
        self.button_set(id).map(ButtonSet::buttons)
    }

    /// Nearest earlier page with a dialog; pages without one cannot be returned to
    fn prev_target(&self, index: usize) -> Option<usize> {
        (0..index).rev().find(|&i| self.pages[i].dialog().is_some())
    }

    fn has_prev(&self, index: usize) -> bool {
        self.prev_target(index).is_some()
    }

    fn has_next(&self, index: usize) -> bool {
        index + 1 < self.pages.len() && self.pages[index].allows_forward()
    }

    fn refresh_buttons(&mut self) {
        for index in 0..self.pages.len() {
            let buttons = ButtonSet::from_links(self.has_prev(index), self.has_next(index)).buttons();
            self.pages[index].add_buttons(&buttons);
        }
    }

    /// Walk the pages with the operator, then run the scenario on finish
    pub fn run(&mut self) -> Result<WizardOutcome> {
        if self.state != WizardState::Idle {
            return Err(WizardError::state(format!(
                "wizard '{}' already ran ({})",
                self.title, self.state
            )));
        }
        if self.pages.is_empty() {
            warn!("Wizard '{}' has no pages", self.title);
            self.state = WizardState::Finished;
            return Ok(WizardOutcome::Empty);
        }

        info!("Starting wizard '{}' with {} pages", self.title, self.pages.len());
        let mut current = 0;

        loop {
            let id = PageId(current);
            self.state = WizardState::Active(id);
            let nav = self.pages[current].run()?;
            debug!("Wizard {} returned {:?}", id, nav);

            match nav {
                NavCode::Next | NavCode::NoOp => {
                    self.pages[current].on_confirm_forward(id, &mut self.scenario);
                    if self.has_next(current) {
                        current += 1;
                    } else {
                        break;
                    }
                }
                NavCode::Finish => {
                    self.pages[current].on_confirm_forward(id, &mut self.scenario);
                    break;
                }
                NavCode::Prev => {
                    self.pages[current].on_confirm_backward(id, &mut self.scenario);
                    match self.prev_target(current) {
                        Some(target) => {
                            for index in (target..current).rev() {
                                self.pages[index]
                                    .on_confirm_backward(PageId(index), &mut self.scenario);
                            }
                            current = target;
                        }
                        None => debug!("Wizard {} has no previous page; showing it again", id),
                    }
                }
                NavCode::Cancel => {
                    info!("Wizard '{}' cancelled at {}", self.title, id);
                    self.state = WizardState::Cancelled;
                    return Ok(WizardOutcome::Cancelled);
                }
            }
        }

        self.state = WizardState::Finished;
        info!(
            "Wizard '{}' finished with {} scenario steps",
            self.title,
            self.scenario.len()
        );
        self.save_settings();
        let report = self.runner.run(&self.scenario)?;
        Ok(WizardOutcome::Completed(report))
    }

    /// Collect page settings and write them. Failures are only logged.
    fn save_settings(&mut self) {
        for page in &self.pages {
            if let (Some(key), Some(value)) = (page.settings_key(), page.export_settings()) {
                self.settings.set(key, value);
            }
        }
        let Some(path) = &self.settings_path else {
            return;
        };
        if let Err(e) = self.settings.save_to_file(path) {
            warn!("Failed to save wizard settings to {:?}: {:#}", path, e);
        }
    }
}
