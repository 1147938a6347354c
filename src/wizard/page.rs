//! Wizard page contract
//!
//! A page binds one dialog to one position in the wizard and turns the
//! dialog's exit code into a navigation intent. Pages contribute scenario
//! steps when the operator confirms them and take them back when the
//! operator returns to them.

use serde_json::Value;
use std::fmt;
use tracing::warn;

use crate::dialog::{Button, DialogBackend};
use crate::error::Result;
use crate::scenario::Scenario;
use crate::types::{
    ButtonAlign, CANCEL_PAGE_CODE, FINISH_PAGE_CODE, NEXT_PAGE_CODE, NavCode, PREV_PAGE_CODE,
};

/// Position of a page in the wizard's page arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub usize);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page #{}", self.0)
    }
}

/// Navigation buttons a page shows, derived from its links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonSet {
    /// Only a next page: Next, Cancel
    First,
    /// Only a previous page: Prev, Cancel, OK
    Last,
    /// No neighbours: Cancel, OK
    Single,
    /// Both neighbours: Prev, Next, Cancel
    Middle,
}

impl ButtonSet {
    pub fn from_links(has_prev: bool, has_next: bool) -> Self {
        match (has_prev, has_next) {
            (false, true) => Self::First,
            (true, false) => Self::Last,
            (false, false) => Self::Single,
            (true, true) => Self::Middle,
        }
    }

    pub fn has_prev(self) -> bool {
        matches!(self, Self::Last | Self::Middle)
    }

    pub fn has_next(self) -> bool {
        matches!(self, Self::First | Self::Middle)
    }

    pub fn buttons(self) -> Vec<Button> {
        let prev = || Button::new("Prev", PREV_PAGE_CODE);
        let next = || Button::new("Next", NEXT_PAGE_CODE);
        let cancel = || Button::new("Cancel", CANCEL_PAGE_CODE);
        let ok = || Button::new("OK", FINISH_PAGE_CODE);
        match self {
            Self::First => vec![next(), cancel()],
            Self::Last => vec![prev(), cancel(), ok()],
            Self::Single => vec![cancel(), ok()],
            Self::Middle => vec![prev(), next(), cancel()],
        }
    }
}

/// One step of the wizard
pub trait WizardPage {
    /// Title used in logs
    fn title(&self) -> &str;

    /// Dialog shown by this page, if any
    fn dialog(&self) -> Option<&dyn DialogBackend>;

    fn dialog_mut(&mut self) -> Option<&mut Box<dyn DialogBackend>>;

    /// Attach the navigation buttons computed by the wizard
    fn add_buttons(&mut self, buttons: &[Button]) {
        if let Some(dlg) = self.dialog_mut() {
            dlg.add_buttons(buttons, ButtonAlign::Right);
        }
    }

    /// Show the dialog and translate its exit code.
    ///
    /// A page without a dialog returns `NavCode::NoOp`. Exit codes that are
    /// not wizard buttons are treated as Cancel.
    fn run(&mut self) -> Result<NavCode> {
        let title = self.title().to_string();
        let Some(dlg) = self.dialog_mut() else {
            warn!("Wizard page '{}' has no dialog", title);
            return Ok(NavCode::NoOp);
        };
        let outcome = dlg.run()?;
        Ok(match NavCode::from_exit_code(outcome.exit_code) {
            Some(code) => code,
            None => {
                warn!(
                    "Wizard page '{}' returned unknown exit code {}; cancelling",
                    title, outcome.exit_code
                );
                NavCode::Cancel
            }
        })
    }

    /// Current checklist state of the page's dialog
    fn selected_items(&self) -> Vec<bool> {
        self.dialog()
            .map(|dlg| dlg.selected_items())
            .unwrap_or_default()
    }

    /// Append this page's scenario steps, tagged with `id`
    fn on_confirm_forward(&mut self, _id: PageId, _scenario: &mut Scenario) {}

    /// Undo `on_confirm_forward`
    fn on_confirm_backward(&mut self, id: PageId, scenario: &mut Scenario) {
        scenario.retract(id);
    }

    /// False when the page blocks moving past it
    fn allows_forward(&self) -> bool {
        true
    }

    /// Key under which this page's settings are persisted
    fn settings_key(&self) -> Option<&str> {
        None
    }

    fn export_settings(&self) -> Option<Value> {
        None
    }

    fn restore_settings(&mut self, _value: &Value) {}

    /// Check or uncheck a program section by index or name
    fn check_section(&mut self, section: &str, _check: bool) -> bool {
        warn!("Wizard page '{}' has no section <{}>", self.title(), section);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(set: ButtonSet) -> Vec<String> {
        set.buttons().into_iter().map(|b| b.label).collect()
    }

    #[test]
    fn test_button_sets_follow_links() {
        assert_eq!(labels(ButtonSet::from_links(false, true)), ["Next", "Cancel"]);
        assert_eq!(labels(ButtonSet::from_links(true, false)), ["Prev", "Cancel", "OK"]);
        assert_eq!(labels(ButtonSet::from_links(false, false)), ["Cancel", "OK"]);
        assert_eq!(labels(ButtonSet::from_links(true, true)), ["Prev", "Next", "Cancel"]);
    }

    #[test]
    fn test_links_round_trip() {
        for prev in [false, true] {
            for next in [false, true] {
                let set = ButtonSet::from_links(prev, next);
                assert_eq!((set.has_prev(), set.has_next()), (prev, next));
            }
        }
    }

    #[test]
    fn test_button_codes() {
        let codes: Vec<_> = ButtonSet::Middle.buttons().iter().map(|b| b.code).collect();
        assert_eq!(codes, [PREV_PAGE_CODE, NEXT_PAGE_CODE, CANCEL_PAGE_CODE]);
    }
}
