//! Runs sub-tasks against one automation session.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use recorder_core::{
    Action, AutomationSession, ElementHandle, ExecutionContext, KeyDirection, Pointer,
    SemanticAction, VarSource, VariableBindings, WaitOptions,
};

use crate::codegen::CodeGenerator;
use crate::error::{OrchestratorError, Result};
use crate::expect::{observe, verify};
use crate::modules::{ModuleSource, MAX_MODULE_DEPTH};
use crate::report::{Reporter, Verdict};

/// How long a verification call waits for an element.
pub const VERIFY_WAIT: Duration = Duration::from_secs(10);
pub const STEP_DELAY: Duration = Duration::from_millis(300);
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// One unit of work for the queue: a context switch or the action itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step<'a> {
    SwitchWindow(i64),
    SwitchFrame(Option<&'a str>),
    Act(&'a Action),
}

impl<'a> Step<'a> {
    /// Sub-tasks needed to run `action` from `context`, in order.
    ///
    /// `context` is moved to the action's window and frame.
    pub fn plan(context: &mut ExecutionContext, action: &'a SemanticAction) -> Vec<Step<'a>> {
        let mut steps = Vec::with_capacity(3);
        if context.needs_window_switch(action) {
            context.enter_window(action.window);
            steps.push(Step::SwitchWindow(action.window));
        }
        if context.needs_frame_switch(action) {
            context.enter_frame(action.frame.clone());
            steps.push(Step::SwitchFrame(action.frame.as_deref()));
        }
        steps.push(Step::Act(&action.action));
        steps
    }
}

/// Nesting position of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub depth: usize,
    /// Whether nested module steps go to the reporter.
    pub report: bool,
}

impl Scope {
    pub fn top(report: bool) -> Self {
        Self { depth: 0, report }
    }

    pub fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }
}

/// Result of replaying a module on one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// Window and frame the session was left in.
    pub context: ExecutionContext,
    pub total: usize,
    pub failed: usize,
}

impl ReplayOutcome {
    pub fn into_result(self, name: &str) -> Result<ExecutionContext> {
        if self.failed == 0 {
            Ok(self.context)
        } else {
            Err(OrchestratorError::ModuleSteps {
                name: name.to_string(),
                failed: self.failed,
                total: self.total,
            })
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    bindings: VariableBindings,
    generator: CodeGenerator,
    modules: Arc<dyn ModuleSource>,
    reporter: Arc<dyn Reporter>,
}

impl Dispatcher {
    pub fn new(
        bindings: VariableBindings,
        generator: CodeGenerator,
        modules: Arc<dyn ModuleSource>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            bindings,
            generator,
            modules,
            reporter,
        }
    }

    pub fn generator(&self) -> &CodeGenerator {
        &self.generator
    }

    /// Execute one sub-task. Module actions move `context` to wherever the
    /// module left the session.
    pub fn run<'a>(
        &'a self,
        session: &'a dyn AutomationSession,
        step: Step<'a>,
        context: &'a mut ExecutionContext,
        scope: Scope,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            match step {
                Step::SwitchWindow(window) => {
                    session.pause(SETTLE_DELAY).await?;
                    session.switch_window(window).await?;
                }
                Step::SwitchFrame(frame) => {
                    session.switch_frame(None).await?;
                    if let Some(frame) = frame {
                        let element = session.wait_for(frame, WaitOptions::new(VERIFY_WAIT)).await?;
                        session.switch_frame(Some(&element)).await?;
                        session.wait_for("body", WaitOptions::new(VERIFY_WAIT)).await?;
                    }
                }
                Step::Act(action) => self.perform(session, action, context, scope).await?,
            }
            Ok(())
        }
        .boxed()
    }

    async fn perform(
        &self,
        session: &dyn AutomationSession,
        action: &Action,
        context: &mut ExecutionContext,
        scope: Scope,
    ) -> Result<()> {
        match action {
            Action::Url { url } => session.navigate(url).await?,
            Action::CloseWindow => session.close_window().await?,
            Action::Sleep { time } => session.pause(Duration::from_millis(*time)).await?,
            Action::WaitBody => {
                session.pause(SETTLE_DELAY).await?;
                session.wait_for("body", WaitOptions::new(VERIFY_WAIT)).await?;
            }
            Action::MouseMove(pointer) => {
                point_at(session, pointer).await?;
            }
            Action::MouseDown(pointer) => {
                point_at(session, pointer).await?;
                session.pointer_down(pointer.button).await?;
            }
            Action::MouseUp(pointer) => {
                point_at(session, pointer).await?;
                session.pointer_up(pointer.button).await?;
            }
            Action::Click(pointer) => {
                point_at(session, pointer).await?;
                session.click(pointer.button).await?;
            }
            Action::DblClick(pointer) => {
                point_at(session, pointer).await?;
                session.double_click().await?;
            }
            Action::TouchClick(target) => {
                let element = locate(session, &target.path, WaitOptions::new(VERIFY_WAIT)).await?;
                session.pause(STEP_DELAY).await?;
                session.touch_tap(&element).await?;
            }
            Action::SendKeys { keys } => session.send_keys(keys).await?,
            Action::KeyDown { character } => {
                session.key_event(character, KeyDirection::Down).await?
            }
            Action::KeyUp { character } => session.key_event(character, KeyDirection::Up).await?,
            Action::ScrollTo { x, y } => session.scroll_to(*x, *y).await?,
            Action::Select { target, option } => {
                let element = locate(session, &target.path, WaitOptions::new(VERIFY_WAIT)).await?;
                session.pause(STEP_DELAY).await?;
                session.select(&element, option).await?;
            }
            Action::AcceptAlert => session.accept_alert().await?,
            Action::DismissAlert => session.dismiss_alert().await?,
            Action::SetAlert { text } => session.set_alert_text(text).await?,
            Action::UploadFile { target, filename } => {
                let options = WaitOptions::new(VERIFY_WAIT).hidden_ok();
                let element = locate(session, &target.path, options).await?;
                session.pause(STEP_DELAY).await?;
                session
                    .send_keys_to(&element, &self.generator.upload_path(filename))
                    .await?;
            }
            Action::Expect(expectation) => {
                let element = match expectation.target.element_path() {
                    Some(path) => {
                        let options = WaitOptions::new(VERIFY_WAIT).hidden_ok();
                        Some(locate(session, path, options).await?)
                    }
                    None => None,
                };
                let observed = observe(session, &expectation.target, element.as_ref()).await?;
                verify(expectation, &observed)?;
            }
            Action::SetVar { target, source } => {
                let value = match source {
                    VarSource::Variable { name } => self
                        .bindings
                        .get(name)
                        .ok_or_else(|| OrchestratorError::MissingVariable(name.clone()))?,
                    VarSource::Faker { locale, pattern } => self.bindings.fake(locale, pattern)?,
                };
                let element = locate(session, &target.path, WaitOptions::new(VERIFY_WAIT)).await?;
                session.pause(STEP_DELAY).await?;
                session.set_element_value(&element, &value).await?;
            }
            Action::Module { name } => {
                let outcome = self
                    .module(session, name, context.clone(), scope.nested())
                    .await?;
                *context = outcome.into_result(name)?;
            }
        }
        Ok(())
    }

    /// Load `name` and replay it on `session` starting from `context`.
    ///
    /// Errors only when the module cannot be run at all; failed steps are
    /// counted in the outcome.
    pub async fn module(
        &self,
        session: &dyn AutomationSession,
        name: &str,
        context: ExecutionContext,
        scope: Scope,
    ) -> Result<ReplayOutcome> {
        if scope.depth > MAX_MODULE_DEPTH {
            return Err(OrchestratorError::ModuleDepth(MAX_MODULE_DEPTH));
        }
        let actions = self.modules.load(name).await?;

        if scope.report {
            self.reporter.module_started(name);
        }
        let outcome = self.replay(session, name, &actions, context, scope).await;
        if scope.report {
            self.reporter.module_finished(name, outcome.failed == 0);
        }
        Ok(outcome)
    }

    /// Run `actions` one after another, never stopping on a failed step.
    pub fn replay<'a>(
        &'a self,
        session: &'a dyn AutomationSession,
        name: &'a str,
        actions: &'a [SemanticAction],
        mut context: ExecutionContext,
        scope: Scope,
    ) -> BoxFuture<'a, ReplayOutcome> {
        async move {
            let mut total = 0;
            let mut failed = 0;

            for action in actions {
                for step in Step::plan(&mut context, action) {
                    let title = self.generator.entry(&step).title;
                    let result = self.run(session, step, &mut context, scope).await;
                    let verdict = Verdict::from_result(result);

                    total += 1;
                    if !verdict.is_success() {
                        failed += 1;
                        warn!(module = name, title = %title, "Module step failed");
                    } else {
                        debug!(module = name, title = %title, "Module step passed");
                    }
                    if scope.report {
                        self.reporter.module_step(name, &title, &verdict);
                    }
                }
            }

            ReplayOutcome {
                context,
                total,
                failed,
            }
        }
        .boxed()
    }
}

async fn locate(
    session: &dyn AutomationSession,
    path: &str,
    options: WaitOptions,
) -> Result<ElementHandle> {
    session.pause(STEP_DELAY).await?;
    Ok(session.wait_for(path, options).await?)
}

async fn point_at(session: &dyn AutomationSession, pointer: &Pointer) -> Result<()> {
    let element = locate(session, &pointer.path, WaitOptions::new(VERIFY_WAIT)).await?;
    session.pause(STEP_DELAY).await?;
    session.move_to(&element, pointer.offset()).await?;
    Ok(())
}
