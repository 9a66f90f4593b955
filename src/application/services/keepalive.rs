//! Keepalive monitor - detects silently dead connections
//!
//! The monitor sends a heartbeat, waits a bounded time for the acknowledgment
//! handed over by the receive loop, then sleeps until the next heartbeat. A
//! failed send or a missing acknowledgment closes the connection for good.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use crate::application::errors::BotError;
use crate::application::messaging::Connection;
use crate::domain::entities::Message;

/// Timing of the heartbeat cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepaliveSettings {
    /// Delay before the first heartbeat, keeps clear of the session handshake
    pub initial_delay: Duration,
    /// Sleep between an acknowledgment and the next heartbeat
    pub interval: Duration,
    /// Longest wait for an acknowledgment
    pub ack_timeout: Duration,
    /// Heartbeat ids start above this value
    pub first_id: u64,
}

impl Default for KeepaliveSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            interval: Duration::from_secs(60),
            ack_timeout: Duration::from_secs(60),
            first_id: 100,
        }
    }
}

/// Where the monitor is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeepaliveState {
    /// Acknowledged, the next heartbeat is due
    Idle,
    /// Heartbeat `id` must be written and acknowledged before `deadline`
    Waiting { id: u64, deadline: Instant },
}

/// Receive-loop side of the acknowledgment handoff
#[derive(Clone)]
pub struct AckSender {
    tx: mpsc::Sender<u64>,
}

impl AckSender {
    /// Hand an acknowledgment to the monitor without blocking.
    /// Dropped (returns false) when one is already pending or the monitor is gone.
    pub fn signal(&self, id: u64) -> bool {
        self.tx.try_send(id).is_ok()
    }
}

/// Single-slot acknowledgment handoff between receive loop and monitor
pub fn ack_channel() -> (AckSender, mpsc::Receiver<u64>) {
    let (tx, rx) = mpsc::channel(1);
    (AckSender { tx }, rx)
}

pub struct KeepaliveMonitor {
    connection: Connection,
    acks: mpsc::Receiver<u64>,
    settings: KeepaliveSettings,
}

impl KeepaliveMonitor {
    pub fn new(connection: Connection, acks: mpsc::Receiver<u64>, settings: KeepaliveSettings) -> Self {
        Self {
            connection,
            acks,
            settings,
        }
    }

    /// Run the heartbeat cycle.
    ///
    /// Returns `Ok(())` when the receive loop went away, otherwise the error
    /// that made the monitor close the connection.
    pub async fn run(mut self) -> Result<(), BotError> {
        tokio::time::sleep(self.settings.initial_delay).await;

        let mut next_id = self.settings.first_id;
        let mut state = KeepaliveState::Idle;
        loop {
            state = match state {
                KeepaliveState::Idle => {
                    next_id += 1;
                    // the ack timeout also bounds a write stuck behind a full socket
                    let deadline = Instant::now() + self.settings.ack_timeout;

                    // acks that arrived while idle belong to an older heartbeat
                    while self.acks.try_recv().is_ok() {}

                    match tokio::time::timeout_at(deadline, self.connection.send(&Message::ping(next_id))).await {
                        Ok(Ok(())) => {
                            tracing::debug!("Heartbeat {} sent", next_id);
                            KeepaliveState::Waiting { id: next_id, deadline }
                        }
                        Ok(Err(e)) => {
                            tracing::error!("Unable to send heartbeat {}: {}", next_id, e);
                            self.connection.close().await;
                            return Err(e);
                        }
                        Err(_) => return Err(self.give_up(next_id).await),
                    }
                }
                KeepaliveState::Waiting { id, deadline } => {
                    match tokio::time::timeout_at(deadline, self.acks.recv()).await {
                        Ok(Some(acked)) => {
                            if acked != id {
                                tracing::debug!("Acknowledgment for {} while waiting on {}", acked, id);
                            }
                            tokio::time::sleep(self.settings.interval).await;
                            KeepaliveState::Idle
                        }
                        Ok(None) => {
                            tracing::debug!("Receive loop gone, stopping keepalive");
                            return Ok(());
                        }
                        Err(_) => return Err(self.give_up(id).await),
                    }
                }
            };
        }
    }

    async fn give_up(&self, id: u64) -> BotError {
        tracing::error!(
            "Heartbeat {} not acknowledged within {:?}, closing connection",
            id,
            self.settings.ack_timeout
        );
        self.connection.close().await;
        BotError::AckTimeout(self.settings.ack_timeout)
    }
}
