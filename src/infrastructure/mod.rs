//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Adapters: Transports (RTM websocket, console, in-memory)

pub mod config;
pub mod adapters;
