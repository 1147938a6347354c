//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use pkgwizard::dialog::{Button, DialogBackend, DialogOutcome, DialogSpec, normalize_selection};
use pkgwizard::error::{Result, WizardError};
use pkgwizard::scenario::{Scenario, ScenarioStep, StepAction, step_action};
use pkgwizard::types::{ButtonAlign, ExitCode};
use pkgwizard::wizard::{PageId, WizardPage};

/// Exit codes replayed by every dialog sharing the script
pub type Script = Rc<RefCell<VecDeque<ExitCode>>>;

/// Button labels each dialog received, newest last
pub type ButtonLog = Rc<RefCell<Vec<Vec<String>>>>;

pub fn script(codes: &[ExitCode]) -> Script {
    Rc::new(RefCell::new(codes.iter().copied().collect()))
}

/// Dialog that replays exit codes instead of asking an operator
pub struct ScriptedDialog {
    spec: DialogSpec,
    script: Script,
    selection: Vec<bool>,
    buttons: Rc<RefCell<Vec<String>>>,
}

impl ScriptedDialog {
    pub fn new(spec: DialogSpec, script: &Script) -> Self {
        Self {
            selection: spec.content.initial_selection(),
            spec,
            script: Rc::clone(script),
            buttons: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Shared view of the labels last passed to `add_buttons`
    pub fn button_labels(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.buttons)
    }
}

impl DialogBackend for ScriptedDialog {
    fn spec(&self) -> &DialogSpec {
        &self.spec
    }

    fn add_buttons(&mut self, buttons: &[Button], _align: ButtonAlign) {
        *self.buttons.borrow_mut() = buttons.iter().map(|b| b.label.clone()).collect();
    }

    fn run(&mut self) -> Result<DialogOutcome> {
        let code = self
            .script
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| WizardError::dialog("dialog script exhausted"))?;
        Ok(self.report_exit(code))
    }

    fn selected_items(&self) -> Vec<bool> {
        self.selection.clone()
    }

    fn set_selected_items(&mut self, selection: &[bool]) {
        self.selection = normalize_selection(&self.spec.content, selection);
    }
}

/// Dialog factory for pages; every dialog replays `script`
pub fn scripted_factory(script: &Script) -> impl Fn(DialogSpec) -> Option<Box<dyn DialogBackend>> {
    let script = Rc::clone(script);
    move |spec| Some(Box::new(ScriptedDialog::new(spec, &script)) as Box<dyn DialogBackend>)
}

/// Names of actions in the order they ran
pub type RunLog = Arc<Mutex<Vec<String>>>;

pub fn run_log() -> RunLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn recording(log: &RunLog, name: &str) -> StepAction {
    let log = Arc::clone(log);
    let name = name.to_string();
    step_action(move |_args| {
        log.lock().unwrap().push(name.clone());
        Ok(true)
    })
}

pub fn ran(log: &RunLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Page contributing one recorded step
pub struct StepPage {
    title: String,
    dialog: Option<Box<dyn DialogBackend>>,
    action: StepAction,
    buttons: Rc<RefCell<Vec<String>>>,
}

impl StepPage {
    pub fn new(title: &str, script: &Script, log: &RunLog) -> Self {
        let dialog = ScriptedDialog::new(
            DialogSpec::new(title, pkgwizard::dialog::DialogContent::Message(title.to_string())),
            script,
        );
        let buttons = dialog.button_labels();
        Self {
            title: title.to_string(),
            dialog: Some(Box::new(dialog)),
            action: recording(log, title),
            buttons,
        }
    }

    pub fn labels(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.buttons)
    }
}

impl WizardPage for StepPage {
    fn title(&self) -> &str {
        &self.title
    }

    fn dialog(&self) -> Option<&dyn DialogBackend> {
        self.dialog.as_deref()
    }

    fn dialog_mut(&mut self) -> Option<&mut Box<dyn DialogBackend>> {
        self.dialog.as_mut()
    }

    fn on_confirm_forward(&mut self, id: PageId, scenario: &mut Scenario) {
        scenario.push(ScenarioStep::new(self.title.clone(), id).action(self.action.clone()));
    }
}
