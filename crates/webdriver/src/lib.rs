pub mod client;
pub mod error;
pub mod keys;
mod session;
pub mod types;

pub use client::WebDriverSession;
pub use error::{Result, WebDriverError};
pub use types::*;
