mod action;
mod bindings;
mod context;
mod event;
mod script;

pub use action::*;
pub use bindings::{FakeData, VariableBindings};
pub use context::ExecutionContext;
pub use event::{Ingress, RawEvent, StagedCommand};
pub use script::{Counters, EntryForm, TestCodeEntry, TestScript, FAILED_MARK};
