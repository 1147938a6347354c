//! Installer pages
//!
//! - `PackageControlPage`: shows prerequisite check results and blocks the
//!   way forward when one fails
//! - `ProgramInstallPage`: checklist of programs from the manifest; each
//!   program becomes an install step
//! - `ProgramUninstallPage`: checklist of programs from the install ledger;
//!   each becomes an uninstall step

use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::engine::Wizard;
use super::page::{PageId, WizardPage};
use crate::dialog::{
    CheckItem, DEFAULT_DLG_HEIGHT, DEFAULT_DLG_WIDTH, DialogBackend, DialogContent, DialogSpec,
    ListRow, create_dialog,
};
use crate::error::Result;
use crate::ledger::InstallLedger;
use crate::manifest::{PackageRequirement, ProgramDescriptor, check_section as check_program_section};
use crate::scenario::{Scenario, ScenarioStep};
use crate::steps::{ActionRegistry, UNINSTALL_ACTION, descriptor_args};
use crate::system::{CheckResult, PackageProbe, check_requirement};
use crate::types::BackendKind;

const EMPTY_SELECTION_TEXT: &str = "WARNING! The selection list is empty";

/// Builds the dialog for a page; `None` means the page has no UI
pub type DialogFactory<'a> = &'a dyn Fn(DialogSpec) -> Option<Box<dyn DialogBackend>>;

/// Dialog factory for the configured backend
pub fn backend_factory(kind: BackendKind) -> impl Fn(DialogSpec) -> Option<Box<dyn DialogBackend>> {
    move |spec| Some(create_dialog(kind, spec))
}

// =============================================================================
// PACKAGE CONTROL
// =============================================================================

/// Prerequisite package check results
pub struct PackageControlPage {
    title: String,
    dialog: Option<Box<dyn DialogBackend>>,
    results: Vec<CheckResult>,
}

impl PackageControlPage {
    /// Run every check now and build the result list
    pub fn new(
        packages: &BTreeMap<String, PackageRequirement>,
        probe: &dyn PackageProbe,
        make_dialog: DialogFactory<'_>,
    ) -> Self {
        debug!("Checking {} prerequisite packages", packages.len());
        let mut results = Vec::with_capacity(packages.len());
        let mut rows = Vec::with_capacity(packages.len());
        for (name, requirement) in packages {
            let result = check_requirement(probe, name, requirement);
            debug!("\t{}\t{:?}\t[{}]", name, result.installed, result.ok);
            rows.push(ListRow {
                name: name.clone(),
                value: result.summary(requirement),
                ok: result.ok,
            });
            results.push(result);
        }

        let spec = DialogSpec::new("Installed packages check", DialogContent::List(rows));
        Self {
            title: "Package check".to_string(),
            dialog: make_dialog(spec),
            results,
        }
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    /// True when every check passed
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.ok)
    }
}

impl WizardPage for PackageControlPage {
    fn title(&self) -> &str {
        &self.title
    }

    fn dialog(&self) -> Option<&dyn DialogBackend> {
        self.dialog.as_deref()
    }

    fn dialog_mut(&mut self) -> Option<&mut Box<dyn DialogBackend>> {
        self.dialog.as_mut()
    }

    fn allows_forward(&self) -> bool {
        self.passed()
    }
}

// =============================================================================
// PROGRAM CHECKLISTS
// =============================================================================

fn checklist_content(programs: &[ProgramDescriptor], default_check: bool) -> DialogContent {
    if programs.is_empty() {
        return DialogContent::Message(EMPTY_SELECTION_TEXT.to_string());
    }
    DialogContent::CheckList(
        programs
            .iter()
            .map(|p| {
                CheckItem::new(
                    p.display_name(),
                    p.display_description(),
                    p.is_checked(default_check),
                )
            })
            .collect(),
    )
}

/// Checklist state shared by the install and uninstall pages
struct ProgramChecklist {
    programs: Vec<ProgramDescriptor>,
    default_check: bool,
    dialog: Option<Box<dyn DialogBackend>>,
}

impl ProgramChecklist {
    fn new(
        programs: Vec<ProgramDescriptor>,
        default_check: bool,
        make_dialog: DialogFactory<'_>,
    ) -> Self {
        for p in &programs {
            debug!(
                "\t{}\t({})\t[{}]",
                p.display_name(),
                p.display_description(),
                p.is_checked(default_check)
            );
        }
        let spec = DialogSpec::configure(
            "Select programs",
            DEFAULT_DLG_HEIGHT,
            DEFAULT_DLG_WIDTH,
            checklist_content(&programs, default_check),
        );
        Self {
            dialog: make_dialog(spec),
            programs,
            default_check,
        }
    }

    /// Push descriptor check flags into the dialog
    fn sync_dialog(&mut self) {
        let selection: Vec<bool> = self
            .programs
            .iter()
            .map(|p| p.is_checked(self.default_check))
            .collect();
        if let Some(dlg) = self.dialog.as_mut() {
            dlg.set_selected_items(&selection);
        }
    }

    /// Dialog selection, or descriptor defaults when there is no dialog
    fn selection(&self) -> Vec<bool> {
        match &self.dialog {
            Some(dlg) if !self.programs.is_empty() => dlg.selected_items(),
            _ => self
                .programs
                .iter()
                .map(|p| p.is_checked(self.default_check))
                .collect(),
        }
    }

    fn check_section(&mut self, section: &str, check: bool) -> bool {
        let found = check_program_section(&mut self.programs, section, check);
        if found {
            self.sync_dialog();
        }
        found
    }

    fn export(&self) -> Value {
        let checked: Vec<&str> = self
            .programs
            .iter()
            .zip(self.selection())
            .filter(|(_, on)| *on)
            .filter_map(|(p, _)| p.identifier())
            .collect();
        json!({ "checked": checked })
    }

    fn restore(&mut self, value: &Value) {
        let Some(checked) = value.get("checked").and_then(Value::as_array) else {
            warn!("Ignoring malformed page settings {}", value);
            return;
        };
        let checked: Vec<&str> = checked.iter().filter_map(Value::as_str).collect();
        for program in &mut self.programs {
            let on = program.identifier().is_some_and(|id| checked.contains(&id));
            program.check = Some(on);
        }
        self.sync_dialog();
    }
}

/// Programs offered for installation; unchecked unless the manifest says so
pub struct ProgramInstallPage {
    title: String,
    list: ProgramChecklist,
    actions: ActionRegistry,
}

impl ProgramInstallPage {
    pub fn new(
        programs: Vec<ProgramDescriptor>,
        actions: ActionRegistry,
        make_dialog: DialogFactory<'_>,
    ) -> Self {
        Self {
            title: "Programs".to_string(),
            list: ProgramChecklist::new(programs, false, make_dialog),
            actions,
        }
    }

    pub fn programs(&self) -> &[ProgramDescriptor] {
        &self.list.programs
    }
}

impl WizardPage for ProgramInstallPage {
    fn title(&self) -> &str {
        &self.title
    }

    fn dialog(&self) -> Option<&dyn DialogBackend> {
        self.list.dialog.as_deref()
    }

    fn dialog_mut(&mut self) -> Option<&mut Box<dyn DialogBackend>> {
        self.list.dialog.as_mut()
    }

    fn selected_items(&self) -> Vec<bool> {
        self.list.selection()
    }

    fn on_confirm_forward(&mut self, id: PageId, scenario: &mut Scenario) {
        if self.list.programs.is_empty() {
            warn!("No programs to install");
            return;
        }
        let selection = self.list.selection();
        for (i, program) in self.list.programs.iter().enumerate() {
            let name = program
                .name
                .clone()
                .unwrap_or_else(|| format!("program_{}", i));
            let enabled = selection.get(i).copied().unwrap_or(false);
            scenario.push(
                ScenarioStep::new(name, id)
                    .maybe_action(self.actions.resolve(program.script.as_deref()))
                    .args(descriptor_args(program))
                    .enabled(enabled),
            );
        }
    }

    fn settings_key(&self) -> Option<&str> {
        Some("install.programs")
    }

    fn export_settings(&self) -> Option<Value> {
        Some(self.list.export())
    }

    fn restore_settings(&mut self, value: &Value) {
        self.list.restore(value);
    }

    fn check_section(&mut self, section: &str, check: bool) -> bool {
        self.list.check_section(section, check)
    }
}

/// Installed programs offered for removal; checked unless the manifest says
/// otherwise
pub struct ProgramUninstallPage {
    title: String,
    list: ProgramChecklist,
    actions: ActionRegistry,
}

impl ProgramUninstallPage {
    /// Join ledger entries with manifest descriptors by identifier.
    ///
    /// Uninstall steps always use the built-in `uninstall` action.
    pub fn from_ledger(
        ledger: &InstallLedger,
        manifest_programs: &[ProgramDescriptor],
        actions: ActionRegistry,
        make_dialog: DialogFactory<'_>,
    ) -> Result<Self> {
        let known: BTreeMap<&str, &ProgramDescriptor> = manifest_programs
            .iter()
            .filter_map(|p| p.identifier().map(|id| (id, p)))
            .collect();

        let programs = ledger
            .entries()?
            .into_iter()
            .map(|entry| {
                let from_manifest = known.get(entry.name.as_str());
                ProgramDescriptor {
                    name: from_manifest.and_then(|p| p.name.clone()),
                    description: Some(
                        from_manifest
                            .and_then(|p| p.description.clone())
                            .unwrap_or_default(),
                    ),
                    check: from_manifest.and_then(|p| p.check),
                    programm: Some(entry.name),
                    dir: Some(entry.path),
                    script: Some(UNINSTALL_ACTION.to_string()),
                    ..ProgramDescriptor::default()
                }
            })
            .collect();

        Ok(Self::new(programs, actions, make_dialog))
    }

    pub fn new(
        programs: Vec<ProgramDescriptor>,
        actions: ActionRegistry,
        make_dialog: DialogFactory<'_>,
    ) -> Self {
        Self {
            title: "Programs".to_string(),
            list: ProgramChecklist::new(programs, true, make_dialog),
            actions,
        }
    }

    pub fn programs(&self) -> &[ProgramDescriptor] {
        &self.list.programs
    }
}

impl WizardPage for ProgramUninstallPage {
    fn title(&self) -> &str {
        &self.title
    }

    fn dialog(&self) -> Option<&dyn DialogBackend> {
        self.list.dialog.as_deref()
    }

    fn dialog_mut(&mut self) -> Option<&mut Box<dyn DialogBackend>> {
        self.list.dialog.as_mut()
    }

    fn selected_items(&self) -> Vec<bool> {
        self.list.selection()
    }

    fn on_confirm_forward(&mut self, id: PageId, scenario: &mut Scenario) {
        let selection = self.list.selection();
        for (i, program) in self.list.programs.iter().enumerate() {
            let name = program
                .identifier()
                .map(str::to_string)
                .unwrap_or_else(|| format!("program_{}", i));
            let enabled = selection.get(i).copied().unwrap_or(false);
            scenario.push(
                ScenarioStep::new(name, id)
                    .maybe_action(self.actions.resolve(program.script.as_deref()))
                    .args(descriptor_args(program))
                    .enabled(enabled),
            );
        }
    }

    fn settings_key(&self) -> Option<&str> {
        Some("uninstall.programs")
    }

    fn export_settings(&self) -> Option<Value> {
        Some(self.list.export())
    }

    fn restore_settings(&mut self, value: &Value) {
        self.list.restore(value);
    }

    fn check_section(&mut self, section: &str, check: bool) -> bool {
        self.list.check_section(section, check)
    }
}

// =============================================================================
// WIZARD HELPERS
// =============================================================================

/// Append the prerequisite page; the flag tells whether every check passed
pub fn add_package_control_page(
    wizard: &mut Wizard,
    packages: &BTreeMap<String, PackageRequirement>,
    probe: &dyn PackageProbe,
    make_dialog: DialogFactory<'_>,
) -> Result<(PageId, bool)> {
    let page = PackageControlPage::new(packages, probe, make_dialog);
    let passed = page.passed();
    if !passed {
        info!("Prerequisite check failed; installation cannot continue past it");
    }
    Ok((wizard.append_page(Box::new(page))?, passed))
}

pub fn add_program_install_page(
    wizard: &mut Wizard,
    programs: Vec<ProgramDescriptor>,
    actions: ActionRegistry,
    make_dialog: DialogFactory<'_>,
) -> Result<PageId> {
    wizard.append_page(Box::new(ProgramInstallPage::new(programs, actions, make_dialog)))
}

pub fn add_program_uninstall_page(
    wizard: &mut Wizard,
    ledger: &InstallLedger,
    manifest_programs: &[ProgramDescriptor],
    actions: ActionRegistry,
    make_dialog: DialogFactory<'_>,
) -> Result<PageId> {
    let page = ProgramUninstallPage::from_ledger(ledger, manifest_programs, actions, make_dialog)?;
    wizard.append_page(Box::new(page))
}
