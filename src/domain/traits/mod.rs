//! Domain traits - Abstractions for infrastructure implementations

pub mod pattern;
pub mod transport;

pub use pattern::{Matcher, Parameters};
pub use transport::{Dialer, FrameSink, FrameStream, Transport};
