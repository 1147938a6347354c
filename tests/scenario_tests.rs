//! Scenario execution and ledger tests
//!
//! Run install and uninstall scenarios against temporary ledgers.

mod common;

use std::fs;
use tempfile::TempDir;

use common::{ran, recording, run_log, script, scripted_factory};
use pkgwizard::error::WizardError;
use pkgwizard::ledger::{InstallLedger, UninstallLog};
use pkgwizard::manifest::ProgramDescriptor;
use pkgwizard::scenario::{
    Scenario, ScenarioRunner, ScenarioStep, SequentialRunner, StepStatus, step_action,
};
use pkgwizard::steps::{ActionRegistry, INSTALL_ACTION, StepContext};
use pkgwizard::types::FINISH_PAGE_CODE;
use pkgwizard::wizard::pages::{add_program_install_page, add_program_uninstall_page};
use pkgwizard::wizard::{PageId, Wizard, WizardOutcome, WizardPage};

fn three_steps(log: &common::RunLog) -> Scenario {
    let mut scenario = Scenario::new();
    scenario.push(ScenarioStep::new("first", PageId(0)).action(recording(log, "first")));
    scenario.push(
        ScenarioStep::new("broken", PageId(0))
            .action(step_action(|_| anyhow::bail!("archive is corrupt"))),
    );
    scenario.push(ScenarioStep::new("third", PageId(1)).action(recording(log, "third")));
    scenario
}

#[test]
fn test_failed_step_does_not_stop_the_rest() {
    let log = run_log();
    let report = SequentialRunner::new(false)
        .run(&three_steps(&log))
        .unwrap();

    assert_eq!(ran(&log), ["first", "third"]);
    assert!(!report.succeeded());
    let failed: Vec<_> = report.failures().map(|o| o.name.as_str()).collect();
    assert_eq!(failed, ["broken"]);
    assert_eq!(
        report.outcomes[1].status,
        StepStatus::Failed("archive is corrupt".to_string())
    );
}

#[test]
fn test_fail_fast_stops_at_first_failure() {
    let log = run_log();
    let err = SequentialRunner::new(true)
        .run(&three_steps(&log))
        .unwrap_err();

    assert!(matches!(err, WizardError::Step { ref name, .. } if name == "broken"));
    assert_eq!(ran(&log), ["first"]);
}

#[test]
fn test_panicking_step_is_isolated() {
    let log = run_log();
    let mut scenario = Scenario::new();
    scenario.push(
        ScenarioStep::new("explodes", PageId(0)).action(step_action(|_| panic!("boom"))),
    );
    scenario.push(ScenarioStep::new("after", PageId(0)).action(recording(&log, "after")));

    let report = SequentialRunner::new(false).run(&scenario).unwrap();
    assert_eq!(ran(&log), ["after"]);
    assert!(matches!(
        &report.outcomes[0].status,
        StepStatus::Failed(reason) if reason.contains("boom")
    ));
}

#[test]
fn test_ledger_rejects_duplicates_and_separators() {
    let dir = TempDir::new().unwrap();
    let ledger = InstallLedger::new(dir.path().join("state").join("install.log"));

    ledger.record_install("editor.tar.gz", "/opt/editor").unwrap();
    let before = fs::read_to_string(ledger.path()).unwrap();

    assert!(matches!(
        ledger.record_install("editor.tar.gz", "/opt/other"),
        Err(WizardError::DuplicatePackage(_))
    ));
    assert!(matches!(
        ledger.record_install("bad;name", "/opt/bad"),
        Err(WizardError::Validation(_))
    ));
    assert_eq!(fs::read_to_string(ledger.path()).unwrap(), before);

    assert_eq!(ledger.path_of(" editor.tar.gz "), Some("/opt/editor".to_string()));
    assert!(ledger.remove("editor.tar.gz").unwrap());
    assert!(!ledger.remove("editor.tar.gz").unwrap());
    assert!(ledger.entries().unwrap().is_empty());
}

/// Install then uninstall directory-only programs through the wizard
#[test]
fn test_install_then_uninstall_round_trip() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state");
    let ledger = InstallLedger::new(state.join("install.log"));
    let ctx = StepContext::new(ledger.clone(), dir.path().join("packages"));

    let programs: Vec<_> = ["notes", "clock"]
        .iter()
        .map(|name| ProgramDescriptor {
            name: Some(name.to_string()),
            description: Some(format!("The {} app", name)),
            dir: Some(dir.path().join("opt").join(name).display().to_string()),
            script: Some(INSTALL_ACTION.to_string()),
            check: Some(true),
            ..ProgramDescriptor::default()
        })
        .collect();

    let codes = script(&[FINISH_PAGE_CODE, FINISH_PAGE_CODE]);
    let factory = scripted_factory(&codes);

    let mut install = Wizard::new("Install");
    add_program_install_page(
        &mut install,
        programs.clone(),
        ActionRegistry::with_builtins(ctx.clone()),
        &factory,
    )
    .unwrap();
    assert!(install.run().unwrap().succeeded());

    let entries = ledger.entries().unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["notes", "clock"]);
    assert!(dir.path().join("opt").join("notes").is_dir());

    let mut uninstall = Wizard::new("Uninstall");
    let id = add_program_uninstall_page(
        &mut uninstall,
        &ledger,
        &programs,
        ActionRegistry::with_builtins(ctx.clone()),
        &factory,
    )
    .unwrap();
    assert_eq!(uninstall.page(id).unwrap().title(), "Programs");
    let outcome = uninstall.run().unwrap();
    let WizardOutcome::Completed(report) = outcome else {
        panic!("uninstall did not complete");
    };
    assert!(report.succeeded());
    assert_eq!(report.outcomes.len(), 2);

    assert!(ledger.entries().unwrap().is_empty());
    assert!(!dir.path().join("opt").join("notes").exists());

    let events = fs::read_to_string(UninstallLog::beside(&ledger).path()).unwrap();
    assert_eq!(events.lines().count(), 2);
    assert!(events.lines().next().unwrap().contains(" : notes : "));
}
