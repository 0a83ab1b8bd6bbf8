mod handler;
mod messages;

pub use handler::{ws_handler, WsState};
pub use messages::{ClientConfig, ClientMessage, ServerMessage};
