//! Recording outputs on disk.
//!
//! A session produces the generated script plus an `<file>.actions.json`
//! log of the dispatched actions, which later sessions can replay as a
//! module.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use recorder_core::{RawEvent, SemanticAction};

use crate::error::Result;

/// Suffix of replayable action logs.
pub const ACTIONS_SUFFIX: &str = ".actions.json";

#[derive(Debug, Clone)]
pub struct OutputFiles {
    root: PathBuf,
}

impl OutputFiles {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn script_path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    pub fn actions_path(&self, file: &str) -> PathBuf {
        self.root.join(format!("{file}{ACTIONS_SUFFIX}"))
    }

    /// Write the rendered script (atomic write via temp file + rename)
    pub async fn write_script(&self, file: &str, content: &str) -> Result<PathBuf> {
        let path = self.script_path(file);
        write_atomic(&path, content.as_bytes()).await?;
        info!(path = %path.display(), "Wrote test script");
        Ok(path)
    }

    /// Write the dispatched actions as raw events
    pub async fn write_actions(&self, file: &str, actions: &[SemanticAction]) -> Result<PathBuf> {
        let events: Vec<RawEvent> = actions.iter().cloned().map(RawEvent::from).collect();
        let json = serde_json::to_string_pretty(&events)?;
        let path = self.actions_path(file);
        write_atomic(&path, json.as_bytes()).await?;
        info!(path = %path.display(), actions = events.len(), "Wrote action log");
        Ok(path)
    }

    /// Names of the replayable action logs in the root directory, sorted.
    pub async fn list_modules(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(ACTIONS_SUFFIX) && entry.file_type().await?.is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}
