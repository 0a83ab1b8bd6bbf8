//! Recording pipeline: normalizer, serialized action queue, dual-session
//! executor, code generator and the session lifecycle around them.

pub mod codegen;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod expect;
pub mod files;
pub mod lifecycle;
pub mod modules;
pub mod normalizer;
pub mod queue;
pub mod report;

pub use codegen::{render_template, CodeGenerator, DEFAULT_TEMPLATE};
pub use dispatch::{Dispatcher, Scope, Step};
pub use error::{OrchestratorError, Result};
pub use executor::{Executor, ExecutorOutput};
pub use files::OutputFiles;
pub use lifecycle::Recorder;
pub use modules::{FsModuleSource, ModuleSource};
pub use normalizer::Normalizer;
pub use queue::ActionQueue;
pub use report::{Reporter, Summary, TracingReporter, Verdict};
