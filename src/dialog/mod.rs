//! Dialog backends
//!
//! Every wizard page renders through a `DialogBackend`. Two interchangeable
//! implementations exist and exactly one is active per process:
//!
//! - `tui` - full-screen ratatui renderer that owns its event loop
//! - `external` - the `dialog(1)` program driven as a subprocess
//!
//! Both normalise their results to `DialogOutcome`, so pages and the wizard
//! engine never see backend-specific return shapes.

pub mod external;
pub mod tui;

use tracing::warn;

use crate::error::Result;
use crate::types::{BackendKind, ButtonAlign, ExitCode, FINISH_PAGE_CODE};

pub use external::ExternalDialog;
pub use tui::TuiDialog;

/// Default dialog height in rows
pub const DEFAULT_DLG_HEIGHT: u16 = 30;
/// Default dialog width in columns
pub const DEFAULT_DLG_WIDTH: u16 = 100;
/// Default visible list height
pub const DEFAULT_LIST_HEIGHT: u16 = DEFAULT_DLG_HEIGHT - 10;
/// Height of a message box
pub const DEFAULT_MSG_HEIGHT: u16 = 10;

/// A button: label shown to the operator and the exit code it returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub code: ExitCode,
}

impl Button {
    pub fn new(label: impl Into<String>, code: ExitCode) -> Self {
        Self {
            label: label.into(),
            code,
        }
    }
}

/// Checklist / radiolist entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckItem {
    pub tag: String,
    pub description: String,
    pub checked: bool,
}

impl CheckItem {
    pub fn new(tag: impl Into<String>, description: impl Into<String>, checked: bool) -> Self {
        Self {
            tag: tag.into(),
            description: description.into(),
            checked,
        }
    }
}

/// Read-only row of a list dialog (package check results)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub name: String,
    pub value: String,
    pub ok: bool,
}

/// What a dialog shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogContent {
    Message(String),
    Input { prompt: String, initial: String },
    CheckList(Vec<CheckItem>),
    RadioList(Vec<CheckItem>),
    List(Vec<ListRow>),
}

impl DialogContent {
    /// Number of cursor-addressable rows
    pub fn row_count(&self) -> usize {
        match self {
            Self::CheckList(items) | Self::RadioList(items) => items.len(),
            Self::List(rows) => rows.len(),
            Self::Message(_) | Self::Input { .. } => 0,
        }
    }

    /// Selection state before the operator touches anything
    pub fn initial_selection(&self) -> Vec<bool> {
        match self {
            Self::CheckList(items) => items.iter().map(|i| i.checked).collect(),
            Self::RadioList(items) => {
                let first = items.iter().position(|i| i.checked);
                (0..items.len()).map(|i| Some(i) == first).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Dialog geometry and content. Building one performs no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSpec {
    pub title: String,
    pub height: u16,
    pub width: u16,
    pub list_height: u16,
    pub content: DialogContent,
}

impl DialogSpec {
    /// Dialog with the default geometry
    pub fn new(title: impl Into<String>, content: DialogContent) -> Self {
        Self::configure(title, DEFAULT_DLG_HEIGHT, DEFAULT_DLG_WIDTH, content)
    }

    pub fn configure(
        title: impl Into<String>,
        height: u16,
        width: u16,
        content: DialogContent,
    ) -> Self {
        Self {
            title: title.into(),
            height,
            width,
            list_height: height.saturating_sub(10).max(1),
            content,
        }
    }
}

/// Auxiliary data returned with the exit code
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    #[default]
    None,
    Text(String),
    Selection(Vec<bool>),
}

/// Normalised result of a dialog run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogOutcome {
    pub exit_code: ExitCode,
    pub payload: Payload,
}

impl DialogOutcome {
    pub fn new(exit_code: ExitCode, payload: Payload) -> Self {
        Self { exit_code, payload }
    }
}

/// Capability contract every dialog backend satisfies
pub trait DialogBackend {
    /// Geometry and content this dialog was built with
    fn spec(&self) -> &DialogSpec;

    /// Replace the button row. Exit codes are the only values `run` returns.
    fn add_buttons(&mut self, buttons: &[Button], align: ButtonAlign);

    /// Block until the operator presses a button (or an equivalent key)
    fn run(&mut self) -> Result<DialogOutcome>;

    /// Which checklist entries are checked right now
    fn selected_items(&self) -> Vec<bool>;

    /// Overwrite the checklist state. Missing entries become unchecked and
    /// surplus flags are ignored.
    fn set_selected_items(&mut self, selection: &[bool]);

    /// Build the outcome for a pressed button
    fn report_exit(&self, code: ExitCode) -> DialogOutcome {
        let payload = match &self.spec().content {
            DialogContent::CheckList(_) | DialogContent::RadioList(_) => {
                Payload::Selection(self.selected_items())
            }
            _ => Payload::None,
        };
        DialogOutcome::new(code, payload)
    }
}

/// Fit a selection to `len` rows. Radio lists keep only the first checked row.
pub fn normalize_selection(content: &DialogContent, selection: &[bool]) -> Vec<bool> {
    let len = content.row_count();
    let mut fitted: Vec<bool> = (0..len)
        .map(|i| selection.get(i).copied().unwrap_or(false))
        .collect();
    if matches!(content, DialogContent::RadioList(_)) {
        if let Some(first) = fitted.iter().position(|&c| c) {
            for (i, flag) in fitted.iter_mut().enumerate() {
                *flag = i == first;
            }
        }
    }
    fitted
}

/// Build a dialog for the configured backend
pub fn create_dialog(kind: BackendKind, spec: DialogSpec) -> Box<dyn DialogBackend> {
    match kind {
        BackendKind::Tui => Box::new(TuiDialog::new(spec)),
        BackendKind::Dialog => Box::new(ExternalDialog::new(spec)),
    }
}

/// Build a dialog from a backend name. Unknown names fail closed.
pub fn create_dialog_by_name(name: &str, spec: DialogSpec) -> Option<Box<dyn DialogBackend>> {
    match name.parse::<BackendKind>() {
        Ok(kind) => Some(create_dialog(kind, spec)),
        Err(_) => {
            warn!("Unsupported dialog type <{}>", name);
            None
        }
    }
}

/// Show a message with a single OK button
pub fn message_box(kind: BackendKind, text: &str, title: &str) -> Result<()> {
    let spec = DialogSpec::configure(
        title,
        DEFAULT_MSG_HEIGHT,
        DEFAULT_DLG_WIDTH,
        DialogContent::Message(text.to_string()),
    );
    let mut dlg = create_dialog(kind, spec);
    dlg.add_buttons(&[Button::new("OK", FINISH_PAGE_CODE)], ButtonAlign::Center);
    dlg.run()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checklist() -> DialogContent {
        DialogContent::CheckList(vec![
            CheckItem::new("editor", "Text editor", true),
            CheckItem::new("viewer", "Image viewer", false),
        ])
    }

    #[test]
    fn test_initial_selection_checklist() {
        assert_eq!(checklist().initial_selection(), vec![true, false]);
    }

    #[test]
    fn test_initial_selection_radiolist_keeps_first_only() {
        let content = DialogContent::RadioList(vec![
            CheckItem::new("a", "", false),
            CheckItem::new("b", "", true),
            CheckItem::new("c", "", true),
        ]);
        assert_eq!(content.initial_selection(), vec![false, true, false]);
    }

    #[test]
    fn test_configure_sets_list_height() {
        let spec = DialogSpec::configure("t", 30, 100, DialogContent::Message("m".into()));
        assert_eq!(spec.list_height, DEFAULT_LIST_HEIGHT);
        let small = DialogSpec::configure("t", 5, 40, DialogContent::Message("m".into()));
        assert_eq!(small.list_height, 1);
    }

    #[test]
    fn test_unknown_backend_fails_closed() {
        let spec = DialogSpec::new("Programs", checklist());
        assert!(create_dialog_by_name("urwid", spec.clone()).is_none());
        assert!(create_dialog_by_name("tui", spec).is_some());
    }

    #[test]
    fn test_normalize_selection() {
        assert_eq!(normalize_selection(&checklist(), &[true]), vec![true, false]);
        assert_eq!(
            normalize_selection(&checklist(), &[false, true, true]),
            vec![false, true]
        );
        let radio = DialogContent::RadioList(vec![
            CheckItem::new("a", "", false),
            CheckItem::new("b", "", false),
        ]);
        assert_eq!(normalize_selection(&radio, &[true, true]), vec![true, false]);
    }

    #[test]
    fn test_set_selected_items() {
        for kind in [BackendKind::Tui, BackendKind::Dialog] {
            let mut dlg = create_dialog(kind, DialogSpec::new("Programs", checklist()));
            dlg.set_selected_items(&[false, true]);
            assert_eq!(dlg.selected_items(), vec![false, true]);
        }
    }

    #[test]
    fn test_report_exit_attaches_selection() {
        let dlg = create_dialog(BackendKind::Tui, DialogSpec::new("Programs", checklist()));
        let outcome = dlg.report_exit(1);
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(outcome.payload, Payload::Selection(vec![true, false]));
    }
}
