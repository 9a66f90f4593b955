//! Application layer - Session behavior on top of the domain types
//! 
//! This layer contains:
//! - Errors: Session, transport, command and config errors
//! - Messaging: Shared connection, conversations, pattern matching, dispatching
//! - Services: Command registry service, keepalive monitor, bot receive loop

pub mod errors;
pub mod services;
pub mod messaging;
