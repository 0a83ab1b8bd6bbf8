use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::faker::PatternFaker;

/// Synthetic-data generator keyed by locale and pattern.
pub trait FakeData: Send + Sync {
    fn fake(&self, locale: &str, pattern: &str) -> Result<String>;
}

/// Test variables plus the synthetic-data generator, read-only to the pipeline.
#[derive(Clone)]
pub struct VariableBindings {
    vars: BTreeMap<String, Value>,
    faker: Arc<dyn FakeData>,
}

impl VariableBindings {
    pub fn new(vars: BTreeMap<String, Value>) -> Self {
        Self {
            vars,
            faker: Arc::new(PatternFaker::new()),
        }
    }

    pub fn with_faker(mut self, faker: Arc<dyn FakeData>) -> Self {
        self.faker = faker;
        self
    }

    /// String form of a variable; non-string JSON values use their JSON text.
    pub fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn vars(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    pub fn fake(&self, locale: &str, pattern: &str) -> Result<String> {
        self.faker.fake(locale, pattern)
    }
}

impl Default for VariableBindings {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl std::fmt::Debug for VariableBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableBindings")
            .field("vars", &self.vars)
            .finish()
    }
}
