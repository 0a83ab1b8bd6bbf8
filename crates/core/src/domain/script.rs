use serde::{Deserialize, Serialize};

/// Marker prefixed to the title of a failed entry.
pub const FAILED_MARK: &str = "\u{00D7} ";

/// How an entry is laid out in the generated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryForm {
    /// Wrapped as one named test case.
    TestCase,
    /// Emitted as bare statements (module calls).
    Inline,
}

/// Generated source for one dispatched sub-task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCodeEntry {
    pub title: String,
    pub lines: Vec<String>,
    pub success: bool,
    pub form: EntryForm,
}

impl TestCodeEntry {
    pub fn test_case(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
            success: true,
            form: EntryForm::TestCase,
        }
    }

    pub fn inline(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
            success: true,
            form: EntryForm::Inline,
        }
    }

    /// Record the outcome; a failure is marked visibly in the title.
    pub fn with_outcome(mut self, success: bool) -> Self {
        self.success = success;
        if !success && !self.title.starts_with(FAILED_MARK) {
            self.title = format!("{FAILED_MARK}{}", self.title);
        }
        self
    }
}

/// Ordered, append-only collection of generated entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestScript {
    entries: Vec<TestCodeEntry>,
}

impl TestScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TestCodeEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TestCodeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome tally; only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    total: u32,
    failed: u32,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, success: bool) {
        self.total += 1;
        if !success {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    pub fn passed(&self) -> u32 {
        self.total - self.failed
    }
}
