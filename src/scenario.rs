//! Scenario executor
//!
//! Pages confirmed with NEXT or FINISH append steps to a `Scenario`. Nothing
//! runs until the wizard finishes; then a `ScenarioRunner` executes the
//! enabled steps in confirmation order. Step failures are isolated: an action
//! that returns an error or panics is logged and recorded, and the remaining
//! steps still run (unless the runner is fail-fast).

use serde_json::{Map, Value};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{Result, WizardError};
use crate::wizard::PageId;

/// Step action. `Ok(true)` means the step did its work, `Ok(false)` that it
/// had nothing to do (already installed, not recorded).
pub type StepAction = Arc<dyn Fn(&StepArgs) -> anyhow::Result<bool> + Send + Sync>;

/// Wrap a closure as a `StepAction`
pub fn step_action<F>(f: F) -> StepAction
where
    F: Fn(&StepArgs) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Positional and keyword arguments handed to a step action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepArgs {
    pub positional: Vec<Value>,
    pub keyword: Map<String, Value>,
}

impl StepArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positional(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn with_keyword(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(key.into(), value.into());
        self
    }

    /// Keyword argument as a string, if present and a string
    pub fn keyword_str(&self, key: &str) -> Option<&str> {
        self.keyword.get(key).and_then(Value::as_str)
    }
}

/// One deferred action
#[derive(Clone)]
pub struct ScenarioStep {
    pub name: String,
    pub action: Option<StepAction>,
    pub args: StepArgs,
    pub enabled: bool,
    /// Page whose confirmation added this step
    pub owner: PageId,
}

impl fmt::Debug for ScenarioStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioStep")
            .field("name", &self.name)
            .field("action", &self.action.as_ref().map(|_| "<fn>"))
            .field("args", &self.args)
            .field("enabled", &self.enabled)
            .field("owner", &self.owner)
            .finish()
    }
}

impl ScenarioStep {
    pub fn new(name: impl Into<String>, owner: PageId) -> Self {
        Self {
            name: name.into(),
            action: None,
            args: StepArgs::default(),
            enabled: true,
            owner,
        }
    }

    pub fn action(mut self, action: StepAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn maybe_action(mut self, action: Option<StepAction>) -> Self {
        self.action = action;
        self
    }

    pub fn args(mut self, args: StepArgs) -> Self {
        self.args = args;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Ordered list of deferred steps
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: ScenarioStep) {
        self.steps.push(step);
    }

    /// Drop every step contributed by `owner`; returns how many were removed
    pub fn retract(&mut self, owner: PageId) -> usize {
        let before = self.steps.len();
        self.steps.retain(|s| s.owner != owner);
        before - self.steps.len()
    }

    pub fn steps(&self) -> &[ScenarioStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Action returned `Ok(changed)`
    Succeeded { changed: bool },
    /// Action returned an error or panicked
    Failed(String),
    /// Step had no action, or was not executed
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
}

/// Outcomes of every enabled step, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub outcomes: Vec<StepOutcome>,
}

impl ScenarioReport {
    /// True unless some executed step failed
    pub fn succeeded(&self) -> bool {
        !self
            .outcomes
            .iter()
            .any(|o| matches!(o.status, StepStatus::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, StepStatus::Failed(_)))
    }
}

/// Strategy for executing a finished scenario
pub trait ScenarioRunner {
    fn run(&self, scenario: &Scenario) -> Result<ScenarioReport>;
}

/// Runs enabled steps in order with failure isolation
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialRunner {
    /// Stop at the first failure and return it as `WizardError::Step`
    pub fail_fast: bool,
}

impl SequentialRunner {
    pub fn new(fail_fast: bool) -> Self {
        Self { fail_fast }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Run one action, converting errors and panics into a status
fn execute_step(step: &ScenarioStep, action: &StepAction) -> StepStatus {
    match panic::catch_unwind(AssertUnwindSafe(|| action(&step.args))) {
        Ok(Ok(changed)) => StepStatus::Succeeded { changed },
        Ok(Err(e)) => StepStatus::Failed(format!("{:#}", e)),
        Err(payload) => StepStatus::Failed(format!("panicked: {}", panic_message(&*payload))),
    }
}

impl ScenarioRunner for SequentialRunner {
    fn run(&self, scenario: &Scenario) -> Result<ScenarioReport> {
        let mut report = ScenarioReport::default();

        for step in scenario.steps().iter().filter(|s| s.enabled) {
            let status = match &step.action {
                None => {
                    warn!("Scenario step '{}' has no action; skipping", step.name);
                    StepStatus::Skipped
                }
                Some(action) => {
                    info!("Running scenario step '{}' args={:?}", step.name, step.args);
                    execute_step(step, action)
                }
            };

            if let StepStatus::Failed(reason) = &status {
                error!("Scenario step '{}' failed: {}", step.name, reason);
                if self.fail_fast {
                    return Err(WizardError::step(&step.name, reason.clone()));
                }
            }

            report.outcomes.push(StepOutcome {
                name: step.name.clone(),
                status,
            });
        }

        info!(
            "Scenario finished: {} steps, success={}",
            report.outcomes.len(),
            report.succeeded()
        );
        Ok(report)
    }
}

/// Logs what would run without running it
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

impl ScenarioRunner for DryRunRunner {
    fn run(&self, scenario: &Scenario) -> Result<ScenarioReport> {
        let outcomes = scenario
            .steps()
            .iter()
            .filter(|s| s.enabled)
            .map(|step| {
                info!("[dry-run] would run '{}' args={:?}", step.name, step.args);
                StepOutcome {
                    name: step.name.clone(),
                    status: StepStatus::Skipped,
                }
            })
            .collect();
        Ok(ScenarioReport { outcomes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> StepAction {
        let log = Arc::clone(log);
        step_action(move |_args| {
            log.lock().unwrap().push(tag.to_string());
            Ok(true)
        })
    }

    #[test]
    fn test_runs_enabled_steps_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scenario = Scenario::new();
        scenario.push(ScenarioStep::new("a", PageId(0)).action(recording(&log, "a")));
        scenario.push(
            ScenarioStep::new("b", PageId(0))
                .action(recording(&log, "b"))
                .enabled(false),
        );
        scenario.push(ScenarioStep::new("c", PageId(1)).action(recording(&log, "c")));

        let report = SequentialRunner::default().run(&scenario).unwrap();
        assert!(report.succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["a", "c"]);
        assert_eq!(report.outcomes.len(), 2);
    }

    #[test]
    fn test_failure_and_panic_are_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scenario = Scenario::new();
        scenario.push(
            ScenarioStep::new("fails", PageId(0))
                .action(step_action(|_| Err(anyhow::anyhow!("disk full")))),
        );
        scenario.push(
            ScenarioStep::new("panics", PageId(0)).action(step_action(|_| panic!("boom"))),
        );
        scenario.push(ScenarioStep::new("runs", PageId(0)).action(recording(&log, "runs")));

        let report = SequentialRunner::default().run(&scenario).unwrap();
        assert!(!report.succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["runs"]);
        assert_eq!(report.outcomes[0].status, StepStatus::Failed("disk full".into()));
        assert_eq!(
            report.outcomes[1].status,
            StepStatus::Failed("panicked: boom".into())
        );
        assert_eq!(report.failures().count(), 2);
    }

    #[test]
    fn test_fail_fast_stops() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scenario = Scenario::new();
        scenario.push(
            ScenarioStep::new("fails", PageId(0))
                .action(step_action(|_| Err(anyhow::anyhow!("disk full")))),
        );
        scenario.push(ScenarioStep::new("later", PageId(0)).action(recording(&log, "later")));

        let err = SequentialRunner::new(true).run(&scenario).unwrap_err();
        assert!(matches!(err, WizardError::Step { ref name, .. } if name == "fails"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_action_is_skipped() {
        let mut scenario = Scenario::new();
        scenario.push(ScenarioStep::new("unknown", PageId(0)));
        let report = SequentialRunner::default().run(&scenario).unwrap();
        assert!(report.succeeded());
        assert_eq!(report.outcomes[0].status, StepStatus::Skipped);
    }

    #[test]
    fn test_retract_removes_only_owner_steps() {
        let mut scenario = Scenario::new();
        scenario.push(ScenarioStep::new("a", PageId(0)));
        scenario.push(ScenarioStep::new("b", PageId(1)));
        scenario.push(ScenarioStep::new("c", PageId(1)));
        assert_eq!(scenario.retract(PageId(1)), 2);
        assert_eq!(scenario.len(), 1);
        assert_eq!(scenario.steps()[0].name, "a");
        assert_eq!(scenario.retract(PageId(7)), 0);
    }

    #[test]
    fn test_dry_run_executes_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scenario = Scenario::new();
        scenario.push(ScenarioStep::new("a", PageId(0)).action(recording(&log, "a")));
        let report = DryRunRunner.run(&scenario).unwrap();
        assert!(report.succeeded());
        assert_eq!(report.outcomes.len(), 1);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_step_args_keyword_lookup() {
        let args = StepArgs::new()
            .with_positional("editor")
            .with_keyword("dir", "/opt/editor");
        assert_eq!(args.keyword_str("dir"), Some("/opt/editor"));
        assert_eq!(args.keyword_str("missing"), None);
        assert_eq!(args.positional.len(), 1);
    }
}
