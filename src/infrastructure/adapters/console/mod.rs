//! Console adapter for development/testing
//!
//! Each stdin line becomes a direct message from the console user, replies are
//! printed to stdout and heartbeats are acknowledged locally.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use crate::application::errors::TransportError;
use crate::domain::entities::{Message, PING_TYPE};
use crate::domain::traits::{FrameSink, FrameStream, Transport};

/// Session identity the console bot runs as
pub const CONSOLE_BOT_ID: &str = "UCONSOLEBOT";

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    channel: String,
    user: String,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            channel: "DCONSOLE".to_string(),
            user: "UCONSOLE".to_string(),
        }
    }

    pub fn bot_id(&self) -> &str {
        CONSOLE_BOT_ID
    }

    /// Transport reading stdin and writing stdout
    pub fn transport(self) -> Transport {
        let (pong_tx, pong_rx) = mpsc::channel(1);
        Transport::new(
            ConsoleSink { pongs: pong_tx },
            ConsoleFrames {
                lines: BufReader::new(tokio::io::stdin()).lines(),
                pongs: pong_rx,
                channel: self.channel,
                user: self.user,
            },
        )
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

struct ConsoleSink {
    pongs: mpsc::Sender<Message>,
}

struct ConsoleFrames {
    lines: Lines<BufReader<Stdin>>,
    pongs: mpsc::Receiver<Message>,
    channel: String,
    user: String,
}

#[async_trait]
impl FrameSink for ConsoleSink {
    async fn send(&mut self, frame: &Message) -> Result<(), TransportError> {
        if frame.kind == PING_TYPE {
            let _ = self.pongs.try_send(Message::pong(frame.id));
            return Ok(());
        }
        println!("[BOT] {}", frame.text);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl FrameStream for ConsoleFrames {
    async fn receive(&mut self) -> Result<Message, TransportError> {
        loop {
            tokio::select! {
                Some(pong) = self.pongs.recv() => return Ok(pong),
                line = self.lines.next_line() => {
                    let line = line.map_err(|e| TransportError::Io(e.to_string()))?;
                    let Some(line) = line else {
                        return Err(TransportError::Closed);
                    };
                    let text = line.trim();
                    if text.is_empty() {
                        continue;
                    }
                    return Ok(Message::text(self.channel.clone(), text).with_user(self.user.clone()));
                }
            }
        }
    }
}
