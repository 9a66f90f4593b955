//! Platform adapters - transports the bot can run on

pub mod console;
pub mod memory;
pub mod rtm;

pub use console::ConsoleAdapter;
pub use rtm::{RtmAdapter, Session, WebSocketDialer};
