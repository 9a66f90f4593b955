//! Application services - Session orchestration

pub mod bot;
pub mod command_service;
pub mod keepalive;

pub use bot::Bot;
pub use command_service::CommandService;
pub use keepalive::{ack_channel, AckSender, KeepaliveMonitor, KeepaliveSettings};
