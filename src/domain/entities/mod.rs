//! Domain entities - Core business objects

pub mod message;
pub mod command;

pub use message::{mention, Message, HELP_KEYWORD, MESSAGE_TYPE, PING_TYPE, PONG_TYPE};
pub use command::{Command, CommandHandler, CommandRegistry};
