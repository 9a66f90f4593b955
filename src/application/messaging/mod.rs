//! Message handling - shared connection, pattern matching and dispatch

pub mod connection;
pub mod conversation;
pub mod dispatcher;
pub mod pattern;

pub use connection::Connection;
pub use conversation::Conversation;
pub use dispatcher::Dispatcher;
pub use pattern::TemplatePattern;
