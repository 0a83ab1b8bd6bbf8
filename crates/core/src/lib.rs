//! Data model shared by the recorder pipeline crates.
//!
//! Raw front-end events, the canonical action vocabulary, the execution
//! context, generated script entries and the automation-session trait.

pub mod domain;
pub mod error;
pub mod faker;
pub mod session;

pub use domain::*;
pub use error::{CoreError, Result};
pub use faker::PatternFaker;
pub use session::{
    AutomationSession, ElementHandle, KeyDirection, SessionError, SessionResult, WaitOptions,
};
