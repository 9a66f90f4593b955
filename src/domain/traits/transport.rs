use async_trait::async_trait;
use crate::application::errors::TransportError;
use crate::domain::entities::Message;

/// Write half of a streaming connection
#[async_trait]
pub trait FrameSink: Send {
    /// Write one complete frame
    async fn send(&mut self, frame: &Message) -> Result<(), TransportError>;

    /// Close the connection. Closing twice must not fail.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a streaming connection
#[async_trait]
pub trait FrameStream: Send {
    /// Wait for the next frame. `TransportError::Closed` once the peer hung up.
    async fn receive(&mut self) -> Result<Message, TransportError>;
}

/// An opened bidirectional frame stream
pub struct Transport {
    pub sink: Box<dyn FrameSink>,
    pub stream: Box<dyn FrameStream>,
}

impl Transport {
    pub fn new(sink: impl FrameSink + 'static, stream: impl FrameStream + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            stream: Box::new(stream),
        }
    }
}

/// Opens streaming connections to session urls
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, url: &str) -> Result<Transport, TransportError>;
}
