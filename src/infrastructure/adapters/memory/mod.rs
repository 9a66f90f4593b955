//! In-memory transport for tests and embedding
//!
//! [`channel`] returns a [`Transport`] for the bot and a [`MemoryPeer`] that
//! plays the remote service: it injects inbound frames and observes what the
//! bot writes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use crate::application::errors::TransportError;
use crate::domain::entities::Message;
use crate::domain::traits::{FrameSink, FrameStream, Transport};

/// Remote end of an in-memory connection
pub struct MemoryPeer {
    inbound: Option<mpsc::UnboundedSender<Result<Message, TransportError>>>,
    outbound: mpsc::UnboundedReceiver<Message>,
    closed: watch::Receiver<bool>,
    close_calls: Arc<AtomicUsize>,
}

struct MemorySink {
    outbound: mpsc::UnboundedSender<Message>,
    closed: watch::Sender<bool>,
    close_calls: Arc<AtomicUsize>,
}

struct MemoryFrames {
    inbound: mpsc::UnboundedReceiver<Result<Message, TransportError>>,
}

/// Connected transport/peer pair
pub fn channel() -> (Transport, MemoryPeer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (closed_tx, closed_rx) = watch::channel(false);
    let close_calls = Arc::new(AtomicUsize::new(0));

    let transport = Transport::new(
        MemorySink {
            outbound: outbound_tx,
            closed: closed_tx,
            close_calls: Arc::clone(&close_calls),
        },
        MemoryFrames { inbound: inbound_rx },
    );
    let peer = MemoryPeer {
        inbound: Some(inbound_tx),
        outbound: outbound_rx,
        closed: closed_rx,
        close_calls,
    };
    (transport, peer)
}

impl MemoryPeer {
    /// Deliver a frame to the bot
    pub fn send(&self, frame: Message) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(Ok(frame));
        }
    }

    /// Make the bot's next read fail
    pub fn fail(&self, error: TransportError) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(Err(error));
        }
    }

    /// Hang up: the bot reads `TransportError::Closed` once queued frames are consumed
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Stop accepting frames; further writes by the bot fail
    pub fn stop_reading(&mut self) {
        self.outbound.close();
    }

    /// Next frame written by the bot, `None` once the write half is gone
    pub async fn next_outbound(&mut self) -> Option<Message> {
        self.outbound.recv().await
    }

    pub fn try_outbound(&mut self) -> Option<Message> {
        self.outbound.try_recv().ok()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Number of close calls that reached the transport
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Resolves once the bot closed its end
    pub async fn wait_closed(&mut self) {
        let _ = self.closed.wait_for(|closed| *closed).await;
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: &Message) -> Result<(), TransportError> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(frame.clone())
            .map_err(|_| TransportError::Io("peer stopped reading".to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.send_replace(true);
        Ok(())
    }
}

#[async_trait]
impl FrameStream for MemoryFrames {
    async fn receive(&mut self) -> Result<Message, TransportError> {
        match self.inbound.recv().await {
            Some(frame) => frame,
            None => Err(TransportError::Closed),
        }
    }
}

/// Sink whose writes never complete, like a socket stuck behind a full buffer
#[cfg(test)]
#[derive(Default)]
pub(crate) struct StalledSink {
    close_calls: Arc<AtomicUsize>,
}

#[cfg(test)]
impl StalledSink {
    pub(crate) fn close_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.close_calls)
    }
}

#[cfg(test)]
#[async_trait]
impl FrameSink for StalledSink {
    async fn send(&mut self, _frame: &Message) -> Result<(), TransportError> {
        std::future::pending::<Result<(), TransportError>>().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
