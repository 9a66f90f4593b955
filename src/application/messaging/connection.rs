//! Shared outbound connection - serializes every frame write behind one lock

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use crate::application::errors::BotError;
use crate::domain::entities::Message;
use crate::domain::traits::FrameSink;

/// Longest wait for the write lock and the transport close handshake
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Cloneable handle to the single write half of the session.
///
/// The heartbeat sender, the help responder and every command handler write
/// through the same handle; each frame is written while holding the lock.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Mutex<Box<dyn FrameSink>>,
    closed: AtomicBool,
    closed_tx: watch::Sender<bool>,
}

impl Connection {
    pub fn new(sink: Box<dyn FrameSink>) -> Self {
        let (closed_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                sink: Mutex::new(sink),
                closed: AtomicBool::new(false),
                closed_tx,
            }),
        }
    }

    /// Write one frame
    pub async fn send(&self, frame: &Message) -> Result<(), BotError> {
        if self.is_closed() {
            return Err(BotError::SendFailed("connection closed".to_string()));
        }
        let mut sink = self.inner.sink.lock().await;
        sink.send(frame)
            .await
            .map_err(|e| BotError::SendFailed(e.to_string()))
    }

    /// Close the connection and wake everyone waiting on [`Connection::closed`].
    /// Closing an already closed connection is a no-op. A writer stuck while
    /// holding the lock delays the transport close by at most `CLOSE_TIMEOUT`.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("Connection already closed");
            return;
        }
        self.inner.closed_tx.send_replace(true);

        let closing = async {
            let mut sink = self.inner.sink.lock().await;
            sink.close().await
        };
        match tokio::time::timeout(CLOSE_TIMEOUT, closing).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Unable to close connection cleanly: {}", e),
            Err(_) => tracing::warn!("Gave up closing connection after {:?}, a write is stuck", CLOSE_TIMEOUT),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Resolves once [`Connection::close`] has been called
    pub async fn closed(&self) {
        let mut rx = self.inner.closed_tx.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}
