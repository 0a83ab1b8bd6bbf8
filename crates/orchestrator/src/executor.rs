use std::sync::Arc;
use std::time::Duration;

use events::{Event, EventBus};
use tracing::{debug, info, warn};

use recorder_core::{
    Action, AutomationSession, Counters, ExecutionContext, SemanticAction, TestCodeEntry,
    TestScript,
};

use crate::dispatch::{Dispatcher, Scope, Step};
use crate::report::{Reporter, Verdict};

/// Pause on the recorder browser between the two runs of a module.
pub const MODULE_SETTLE: Duration = Duration::from_secs(1);
/// How long the recorder browser may take to finish loading after a module.
pub const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the executor accumulated over a session.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOutput {
    pub script: TestScript,
    pub counters: Counters,
    /// Dispatched actions in dispatch order.
    pub actions: Vec<SemanticAction>,
}

/// Runs each queued sub-task against the verification session and turns
/// the outcome into a script entry.
pub struct Executor {
    recorder: Arc<dyn AutomationSession>,
    checker: Option<Arc<dyn AutomationSession>>,
    dispatcher: Dispatcher,
    reporter: Arc<dyn Reporter>,
    event_bus: EventBus,
    output: ExecutorOutput,
}

impl Executor {
    pub fn new(
        recorder: Arc<dyn AutomationSession>,
        checker: Option<Arc<dyn AutomationSession>>,
        dispatcher: Dispatcher,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            recorder,
            checker,
            dispatcher,
            reporter,
            event_bus: EventBus::new(),
            output: ExecutorOutput::default(),
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = bus;
        self
    }

    pub fn is_checked(&self) -> bool {
        self.checker.is_some()
    }

    pub fn counters(&self) -> &Counters {
        &self.output.counters
    }

    pub fn script(&self) -> &TestScript {
        &self.output.script
    }

    /// Run the context switches and the action itself. Never fails: every
    /// error becomes a failed entry.
    pub async fn execute(&mut self, context: &mut ExecutionContext, action: SemanticAction) {
        debug!(
            cmd = action.cmd(),
            window = action.window,
            frame = ?action.frame,
            "Executing action"
        );

        for step in Step::plan(context, &action) {
            match step {
                Step::Act(Action::Module { name }) => self.run_module(context, step, name).await,
                step => self.run_step(context, step).await,
            }
        }
        self.output.actions.push(action);
    }

    async fn run_step(&mut self, context: &mut ExecutionContext, step: Step<'_>) {
        let entry = self.dispatcher.generator().entry(&step);
        self.reporter.step_started(&entry.title);

        let verdict = match &self.checker {
            Some(checker) => Verdict::from_result(
                self.dispatcher
                    .run(checker.as_ref(), step, context, Scope::top(true))
                    .await,
            ),
            None => Verdict::Unchecked,
        };
        self.settle(entry, verdict);
    }

    /// Modules run on the recorder browser first, then on the checker.
    async fn run_module(&mut self, context: &mut ExecutionContext, step: Step<'_>, name: &str) {
        let entry = self.dispatcher.generator().entry(&step);
        self.reporter.step_started(&entry.title);
        self.event_bus.emit(Event::ModuleStarted {
            file: name.to_string(),
        });
        info!(module = name, checked = self.is_checked(), "Running module");

        let start = context.clone();
        let recorded = self
            .dispatcher
            .module(
                self.recorder.as_ref(),
                name,
                start.clone(),
                Scope::top(!self.is_checked()).nested(),
            )
            .await;

        let verdict = match (recorded, &self.checker) {
            (Err(e), _) => Verdict::Failed(e.to_string()),
            (Ok(outcome), None) => {
                *context = outcome.context;
                Verdict::Unchecked
            }
            (Ok(_), Some(checker)) => {
                self.settle_recorder().await;
                match self
                    .dispatcher
                    .module(checker.as_ref(), name, start, Scope::top(true).nested())
                    .await
                {
                    Ok(outcome) => {
                        *context = outcome.context.clone();
                        Verdict::from_result(outcome.into_result(name))
                    }
                    Err(e) => Verdict::Failed(e.to_string()),
                }
            }
        };

        self.event_bus.emit(Event::ModuleEnded {
            file: name.to_string(),
            success: verdict.is_success(),
        });
        self.settle(entry, verdict);
    }

    async fn settle_recorder(&self) {
        let settled = async {
            self.recorder.pause(MODULE_SETTLE).await?;
            self.recorder.wait_ready(READY_TIMEOUT).await
        };
        if let Err(e) = settled.await {
            warn!(error = %e, "Recorder browser did not settle after module");
        }
    }

    fn settle(&mut self, entry: TestCodeEntry, verdict: Verdict) {
        let success = verdict.is_success();
        self.output.counters.record(success);
        self.reporter.step_finished(&entry.title, &verdict);

        if let Verdict::Failed(reason) = &verdict {
            warn!(title = %entry.title, reason = %reason, "Step failed");
        }
        if entry.lines.is_empty() {
            return;
        }
        if self.is_checked() {
            self.event_bus.emit(Event::CheckResult {
                title: entry.title.clone(),
                success,
            });
        }
        self.output.script.push(entry.with_outcome(success));
    }

    pub fn finish(self) -> ExecutorOutput {
        self.output
    }
}
