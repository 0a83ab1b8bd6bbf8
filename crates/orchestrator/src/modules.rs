//! Named, previously recorded action scripts that a session can include.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use recorder_core::{RawEvent, SemanticAction};

use crate::error::{OrchestratorError, Result};

/// Nested `module` actions are followed at most this deep.
pub const MAX_MODULE_DEPTH: usize = 8;

#[async_trait]
pub trait ModuleSource: Send + Sync {
    async fn load(&self, name: &str) -> Result<Vec<SemanticAction>>;
}

/// Loads `<root>/<name>` as a JSON array of raw events.
#[derive(Debug, Clone)]
pub struct FsModuleSource {
    root: PathBuf,
}

impl FsModuleSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let plain = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !plain {
            return Err(OrchestratorError::module_load(
                name,
                "module names must be relative paths inside the working directory",
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ModuleSource for FsModuleSource {
    async fn load(&self, name: &str) -> Result<Vec<SemanticAction>> {
        let path = self.resolve(name)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| OrchestratorError::module_load(name, e))?;
        let events: Vec<RawEvent> =
            serde_json::from_str(&content).map_err(|e| OrchestratorError::module_load(name, e))?;

        let mut actions = Vec::with_capacity(events.len());
        for event in events {
            let cmd = event.cmd.clone();
            match SemanticAction::try_from(event) {
                Ok(action) => actions.push(action),
                Err(e) => warn!(module = name, cmd = %cmd, error = %e, "Skipping undecodable module step"),
            }
        }
        debug!(module = name, steps = actions.len(), "Loaded module");
        Ok(actions)
    }
}
