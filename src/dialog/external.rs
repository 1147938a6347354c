//! `dialog(1)` subprocess backend
//!
//! Each run spawns the `dialog` program with `--stdout` so the widget result
//! is written to a pipe while the widget itself draws on the terminal.
//! `dialog` has at most three buttons (OK, Extra, Cancel); the forward button
//! goes to OK, Prev to Extra and Cancel to Cancel.
//!
//! Exit status of `dialog`:
//!
//! | status | meaning |
//! |---|---|
//! | 0 | OK button |
//! | 1 | Cancel button |
//! | 3 | Extra button |
//! | 255 | ESC or error |

use std::process::{Command, Stdio};
use tracing::{debug, warn};

use super::{
    Button, DialogBackend, DialogContent, DialogOutcome, DialogSpec, Payload, normalize_selection,
};
use crate::command::CommandArgs;
use crate::error::{Result, WizardError};
use crate::types::{
    ButtonAlign, CANCEL_PAGE_CODE, ExitCode, FINISH_PAGE_CODE, NEXT_PAGE_CODE, PREV_PAGE_CODE,
};

/// Program name resolved through PATH
pub const DIALOG_PROGRAM: &str = "dialog";

pub const DLG_STATUS_OK: i32 = 0;
pub const DLG_STATUS_CANCEL: i32 = 1;
pub const DLG_STATUS_EXTRA: i32 = 3;
pub const DLG_STATUS_ESC: i32 = 255;

/// Read-only field type for `--mixedform`
const MIXEDFORM_READ_ONLY: u8 = 2;
/// Column where list values start in `--mixedform`
const LIST_VALUE_COLUMN: usize = 32;

/// Wizard buttons placed onto the three `dialog` button slots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonSlots {
    pub ok: Option<Button>,
    pub extra: Option<Button>,
    pub cancel: Option<Button>,
}

impl ButtonSlots {
    /// Place buttons by the code they return.
    ///
    /// The forward button (Next, else OK/Finish) takes the OK slot so Enter
    /// moves on, Prev takes Extra and Cancel takes Cancel. Buttons with other
    /// codes fill the free slots in order; anything left over is dropped.
    pub fn from_buttons(buttons: &[Button]) -> Self {
        let forward = buttons
            .iter()
            .position(|b| b.code == NEXT_PAGE_CODE)
            .or_else(|| buttons.iter().position(|b| b.code == FINISH_PAGE_CODE));

        let mut slots = Self::default();
        let mut unplaced = Vec::new();
        for (i, button) in buttons.iter().enumerate() {
            let slot = if forward == Some(i) {
                &mut slots.ok
            } else if button.code == PREV_PAGE_CODE && slots.extra.is_none() {
                &mut slots.extra
            } else if button.code == CANCEL_PAGE_CODE && slots.cancel.is_none() {
                &mut slots.cancel
            } else {
                unplaced.push(button);
                continue;
            };
            *slot = Some(button.clone());
        }

        for button in unplaced {
            let free = [&mut slots.ok, &mut slots.extra, &mut slots.cancel]
                .into_iter()
                .find(|slot| slot.is_none());
            match free {
                Some(slot) => *slot = Some(button.clone()),
                None => warn!("dialog supports three buttons; ignoring <{}>", button.label),
            }
        }
        slots
    }

    /// Label arguments placed before the widget option
    fn label_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ok) = &self.ok {
            args.push("--ok-label".to_string());
            args.push(ok.label.clone());
        }
        if let Some(extra) = &self.extra {
            args.push("--extra-button".to_string());
            args.push("--extra-label".to_string());
            args.push(extra.label.clone());
        }
        match &self.cancel {
            Some(cancel) => {
                args.push("--cancel-label".to_string());
                args.push(cancel.label.clone());
            }
            None => args.push("--no-cancel".to_string()),
        }
        args
    }

    /// Translate a `dialog` exit status into the wizard button code
    pub fn exit_code_for(&self, status: i32) -> Result<ExitCode> {
        let code = match status {
            DLG_STATUS_OK => self.ok.as_ref().map_or(FINISH_PAGE_CODE, |b| b.code),
            DLG_STATUS_EXTRA => match &self.extra {
                Some(b) => b.code,
                None => {
                    return Err(WizardError::dialog(
                        "dialog reported the extra button but none was configured",
                    ));
                }
            },
            DLG_STATUS_CANCEL => self.cancel.as_ref().map_or(CANCEL_PAGE_CODE, |b| b.code),
            DLG_STATUS_ESC => CANCEL_PAGE_CODE,
            other => {
                return Err(WizardError::dialog(format!(
                    "dialog exited with unexpected status {}",
                    other
                )));
            }
        };
        Ok(code)
    }
}

/// Full argument list for one `dialog` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogInvocation {
    args: Vec<String>,
}

impl DialogInvocation {
    pub fn new(spec: &DialogSpec, slots: &ButtonSlots, selection: &[bool]) -> Self {
        Self {
            args: build_args(spec, slots, selection),
        }
    }
}

impl CommandArgs for DialogInvocation {
    fn program(&self) -> &'static str {
        DIALOG_PROGRAM
    }

    fn to_cli_args(&self) -> Vec<String> {
        self.args.clone()
    }
}

fn on_off(checked: bool) -> String {
    let state = if checked { "on" } else { "off" };
    state.to_string()
}

/// Build the argv (without the program name) for a dialog.
///
/// `selection` gives the initial on/off state of checklist rows.
pub fn build_args(spec: &DialogSpec, slots: &ButtonSlots, selection: &[bool]) -> Vec<String> {
    let mut args = vec![
        "--stdout".to_string(),
        "--title".to_string(),
        spec.title.clone(),
    ];
    args.extend(slots.label_args());

    let height = spec.height.to_string();
    let width = spec.width.to_string();
    let list_height = spec.list_height.to_string();

    match &spec.content {
        DialogContent::Message(text) => {
            args.extend(["--msgbox".to_string(), text.clone(), height, width]);
        }
        DialogContent::Input { prompt, initial } => {
            args.extend([
                "--inputbox".to_string(),
                prompt.clone(),
                height,
                width,
                initial.clone(),
            ]);
        }
        DialogContent::CheckList(items) | DialogContent::RadioList(items) => {
            let radio = matches!(spec.content, DialogContent::RadioList(_));
            args.push("--separate-output".to_string());
            args.push("--no-tags".to_string());
            args.push(if radio { "--radiolist" } else { "--checklist" }.to_string());
            args.extend([spec.title.clone(), height, width, list_height]);
            for (i, item) in items.iter().enumerate() {
                // Tags are 1-based indices so duplicate labels stay distinct
                args.push((i + 1).to_string());
                args.push(format!("{}  {}", item.tag, item.description).trim().to_string());
                args.push(on_off(selection.get(i).copied().unwrap_or(false)));
            }
        }
        DialogContent::List(rows) => {
            args.extend(["--mixedform".to_string(), spec.title.clone(), height, width, list_height]);
            for (i, row) in rows.iter().enumerate() {
                let y = (i + 1).to_string();
                let value = format!("{} [{}]", row.value, if row.ok { "OK" } else { "FAIL" });
                args.extend([
                    row.name.clone(),
                    y.clone(),
                    "1".to_string(),
                    value.clone(),
                    y,
                    LIST_VALUE_COLUMN.to_string(),
                    value.len().max(1).to_string(),
                    "0".to_string(),
                    MIXEDFORM_READ_ONLY.to_string(),
                ]);
            }
        }
    }
    args
}

/// Parse `--separate-output` tags (1-based indices) into a selection vector.
///
/// Unknown or out-of-range tags are ignored with a warning.
pub fn parse_selection(stdout: &str, len: usize) -> Vec<bool> {
    let mut selection = vec![false; len];
    for tag in stdout.split_whitespace() {
        match tag.trim_matches('"').parse::<usize>() {
            Ok(n) if n >= 1 && n <= len => selection[n - 1] = true,
            _ => warn!("Ignoring unexpected dialog output tag <{}>", tag),
        }
    }
    selection
}

/// Dialog drawn by the external `dialog` program
pub struct ExternalDialog {
    spec: DialogSpec,
    slots: ButtonSlots,
    selection: Vec<bool>,
    text: String,
}

impl ExternalDialog {
    pub fn new(spec: DialogSpec) -> Self {
        let selection = spec.content.initial_selection();
        let text = match &spec.content {
            DialogContent::Input { initial, .. } => initial.clone(),
            _ => String::new(),
        };
        Self {
            spec,
            slots: ButtonSlots::default(),
            selection,
            text,
        }
    }

    pub fn slots(&self) -> &ButtonSlots {
        &self.slots
    }

    /// Argument list the next `run` will use
    pub fn invocation(&self) -> DialogInvocation {
        DialogInvocation::new(&self.spec, &self.slots, &self.selection)
    }

    /// Apply a finished `dialog` process result
    pub fn apply_result(&mut self, status: i32, stdout: &str) -> Result<DialogOutcome> {
        let code = self.slots.exit_code_for(status)?;
        // OK and Extra both print the widget result; empty output means nothing checked
        if status == DLG_STATUS_OK || status == DLG_STATUS_EXTRA {
            match &self.spec.content {
                DialogContent::CheckList(items) | DialogContent::RadioList(items) => {
                    self.selection = parse_selection(stdout, items.len());
                }
                DialogContent::Input { .. } => {
                    self.text = stdout.trim_end_matches(['\n', '\r']).to_string();
                }
                _ => {}
            }
        }
        Ok(self.report_exit(code))
    }
}

impl DialogBackend for ExternalDialog {
    fn spec(&self) -> &DialogSpec {
        &self.spec
    }

    fn add_buttons(&mut self, buttons: &[Button], align: ButtonAlign) {
        if align != ButtonAlign::Center {
            debug!("dialog ignores button alignment {}", align);
        }
        self.slots = ButtonSlots::from_buttons(buttons);
    }

    fn run(&mut self) -> Result<DialogOutcome> {
        let invocation = self.invocation();
        debug!("Running {} {:?}", DIALOG_PROGRAM, invocation.to_cli_args());

        let output = Command::new(invocation.program())
            .args(invocation.to_cli_args())
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| WizardError::dialog(format!("Failed to run {}: {}", DIALOG_PROGRAM, e)))?;

        let status = output
            .status
            .code()
            .ok_or_else(|| WizardError::dialog(format!("{} terminated by signal", DIALOG_PROGRAM)))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        self.apply_result(status, &stdout)
    }

    fn selected_items(&self) -> Vec<bool> {
        self.selection.clone()
    }

    fn set_selected_items(&mut self, selection: &[bool]) {
        self.selection = normalize_selection(&self.spec.content, selection);
    }

    fn report_exit(&self, code: ExitCode) -> DialogOutcome {
        let payload = match &self.spec.content {
            DialogContent::CheckList(_) | DialogContent::RadioList(_) => {
                Payload::Selection(self.selected_items())
            }
            DialogContent::Input { .. } => Payload::Text(self.text.clone()),
            _ => Payload::None,
        };
        DialogOutcome::new(code, payload)
    }
}
