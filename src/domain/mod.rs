//! Domain layer - Core protocol types with no I/O
//! 
//! This layer contains:
//! - Entities: Frames and commands (Message, Command, CommandRegistry)
//! - Traits: Abstractions for infrastructure (Matcher, FrameSink, FrameStream, Dialer)

pub mod entities;
pub mod traits;
