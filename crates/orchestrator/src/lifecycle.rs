//! Recording session from first raw event to the written script.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use events::{Event, EventBus, SessionRole};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use recorder_core::{AutomationSession, Ingress, SemanticAction, StagedCommand, VariableBindings};

use crate::codegen::{render_template, CodeGenerator, DEFAULT_TEMPLATE, DEFAULT_UPLOAD_DIR};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::executor::Executor;
use crate::files::OutputFiles;
use crate::modules::{FsModuleSource, ModuleSource};
use crate::normalizer::Normalizer;
use crate::queue::ActionQueue;
use crate::report::{Reporter, Summary, TracingReporter};

pub const KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(2);
pub const KEEP_ALIVE_ROUNDS: u32 = 900;

pub struct Recorder {
    recorder: Arc<dyn AutomationSession>,
    checker: Option<Arc<dyn AutomationSession>>,
    output: OutputFiles,
    file: String,
    template: String,
    upload_dir: String,
    bindings: VariableBindings,
    modules: Arc<dyn ModuleSource>,
    reporter: Arc<dyn Reporter>,
    event_bus: EventBus,
}

impl Recorder {
    /// `file` is written into `dir`; modules are loaded from `dir` too.
    pub fn new(
        recorder: Arc<dyn AutomationSession>,
        checker: Option<Arc<dyn AutomationSession>>,
        dir: impl AsRef<Path>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            recorder,
            checker,
            output: OutputFiles::new(dir.as_ref()),
            file: file.into(),
            template: DEFAULT_TEMPLATE.to_string(),
            upload_dir: DEFAULT_UPLOAD_DIR.to_string(),
            bindings: VariableBindings::default(),
            modules: Arc::new(FsModuleSource::new(dir)),
            reporter: Arc::new(TracingReporter),
            event_bus: EventBus::new(),
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = bus;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_modules(mut self, modules: Arc<dyn ModuleSource>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_bindings(mut self, bindings: VariableBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_upload_dir(mut self, dir: impl Into<String>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Record until the end signal (or the ingress closing), then tear down.
    pub async fn run(self, mut ingress: mpsc::Receiver<Ingress>) -> Result<Summary> {
        let checked = self.checker.is_some();
        let (stop_tx, stop_rx) = watch::channel(false);

        let mut keep_alive = vec![self.keep_alive(SessionRole::Recorder, &self.recorder, &stop_rx)];
        if let Some(checker) = &self.checker {
            keep_alive.push(self.keep_alive(SessionRole::Checker, checker, &stop_rx));
        }

        let dispatcher = Dispatcher::new(
            self.bindings.clone(),
            CodeGenerator::new(self.upload_dir.clone()),
            self.modules.clone(),
            self.reporter.clone(),
        );
        let executor = Executor::new(
            self.recorder.clone(),
            self.checker.clone(),
            dispatcher,
            self.reporter.clone(),
        )
        .with_event_bus(self.event_bus.clone());
        let queue = ActionQueue::spawn(executor);

        info!(file = %self.file, checked, "Recording started");
        let mut normalizer = Normalizer::new();

        loop {
            let deadline = normalizer.deadline();
            tokio::select! {
                message = ingress.recv() => match message {
                    Some(Ingress::Event(raw)) => {
                        let cmd = raw.cmd.clone();
                        match StagedCommand::decode(raw, Instant::now()) {
                            Ok(staged) => {
                                for action in normalizer.push(staged) {
                                    queue.push(action)?;
                                }
                            }
                            Err(e) => warn!(cmd = %cmd, error = %e, "Dropping undecodable event"),
                        }
                    }
                    Some(Ingress::End) => {
                        info!("End of recording requested");
                        break;
                    }
                    None => {
                        debug!("Ingress closed");
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    for action in normalizer.expire(Instant::now()) {
                        queue.push(action)?;
                    }
                }
            }
        }

        for action in normalizer.flush() {
            queue.push(action)?;
        }
        let output = queue.drain().await?;

        let _ = stop_tx.send(true);
        for task in keep_alive {
            if let Err(e) = task.await {
                warn!(error = %e, "Keep-alive task ended abnormally");
            }
        }

        self.close(SessionRole::Recorder, &self.recorder).await;

        let rendered = render_template(&self.template, &output.script);
        let written = self.write_outputs(&rendered, &output.actions).await;

        if let Some(checker) = &self.checker {
            self.close(SessionRole::Checker, checker).await;
        }
        let path = written?;

        let summary = Summary {
            total: output.counters.total(),
            passed: output.counters.passed(),
            failed: output.counters.failed(),
            checked,
            output: Some(path),
        };
        self.reporter.summary(&summary);
        Ok(summary)
    }

    async fn write_outputs(
        &self,
        rendered: &str,
        actions: &[SemanticAction],
    ) -> Result<PathBuf> {
        let path = self.output.write_script(&self.file, rendered).await?;
        self.output.write_actions(&self.file, actions).await?;
        Ok(path)
    }

    fn keep_alive(
        &self,
        role: SessionRole,
        session: &Arc<dyn AutomationSession>,
        stop: &watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        self.event_bus.emit(Event::SessionOpened { role });
        spawn_keep_alive(role, session.clone(), stop.clone())
    }

    async fn close(&self, role: SessionRole, session: &Arc<dyn AutomationSession>) {
        match session.close().await {
            Ok(()) => info!(role = role.as_str(), "Session closed"),
            Err(e) => warn!(role = role.as_str(), error = %e, "Failed to close session"),
        }
        self.event_bus.emit(Event::SessionClosed { role });
    }
}

/// Probe `session` periodically so the remote end does not time it out.
fn spawn_keep_alive(
    role: SessionRole,
    session: Arc<dyn AutomationSession>,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        for round in 0..KEEP_ALIVE_ROUNDS {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                    continue;
                }
                _ = tokio::time::sleep(KEEP_ALIVE_PERIOD) => {}
            }
            if let Err(e) = session.probe().await {
                warn!(role = role.as_str(), round, error = %e, "Keep-alive probe failed");
            }
        }
        debug!(role = role.as_str(), "Keep-alive stopped");
    })
}
