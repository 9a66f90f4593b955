//! Client for a real-time messaging service.
//!
//! A [`Bot`] is created from a negotiated session, keeps its streaming
//! connection alive with heartbeats and routes every relevant message to the
//! commands whose pattern matches it.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use application::errors::{BotError, CommandError, ConfigError, TransportError};
pub use application::messaging::{Connection, Conversation, TemplatePattern};
pub use application::services::{Bot, KeepaliveSettings};
pub use domain::entities::{Command, CommandHandler, Message};
pub use domain::traits::{Dialer, FrameSink, FrameStream, Matcher, Parameters, Transport};
pub use infrastructure::config::Config;
