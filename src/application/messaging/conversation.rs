//! Per-match context handed to command handlers

use crate::application::errors::CommandError;
use crate::domain::entities::{mention, Message};
use crate::domain::traits::Parameters;
use super::connection::Connection;

/// Parameters extracted by the match, the triggering message and a reply capability
pub struct Conversation {
    params: Parameters,
    message: Message,
    connection: Connection,
}

impl Conversation {
    pub fn new(params: Parameters, message: Message, connection: Connection) -> Self {
        Self {
            params,
            message,
            connection,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Captured parameter as text
    pub fn string(&self, name: &str) -> Result<&str, CommandError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| CommandError::MissingParameter(name.to_string()))
    }

    /// Captured parameter parsed as an integer
    pub fn integer(&self, name: &str) -> Result<i64, CommandError> {
        self.string(name)?
            .parse()
            .map_err(|e: std::num::ParseIntError| CommandError::InvalidParameter {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Reply in the originating channel, addressing the sender outside direct messages
    pub async fn reply(&self, text: impl AsRef<str>) -> Result<(), CommandError> {
        let text = if self.message.is_direct_message() {
            text.as_ref().to_string()
        } else {
            format!("{}: {}", mention(&self.message.user), text.as_ref())
        };
        self.connection.send(&self.message.reply(text)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::memory;

    fn conversation(channel: &str, params: &[(&str, &str)]) -> (Conversation, memory::MemoryPeer) {
        let (transport, peer) = memory::channel();
        let params = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let message = Message::text(channel, "ignored").with_user("U1");
        (Conversation::new(params, message, Connection::new(transport.sink)), peer)
    }

    #[test]
    fn test_parameter_accessors() {
        let (conv, _peer) = conversation("C1", &[("env", "production"), ("count", "-3")]);
        assert_eq!(conv.string("env").unwrap(), "production");
        assert_eq!(conv.integer("count").unwrap(), -3);
        assert!(matches!(conv.string("missing"), Err(CommandError::MissingParameter(_))));
        assert!(matches!(conv.integer("env"), Err(CommandError::InvalidParameter { .. })));
    }

    #[tokio::test]
    async fn test_reply_in_channel_mentions_sender() {
        let (conv, mut peer) = conversation("C1", &[]);
        conv.reply("done").await.unwrap();

        let frame = peer.next_outbound().await.unwrap();
        assert_eq!(frame.channel, "C1");
        assert_eq!(frame.text, "<@U1>: done");
    }

    #[tokio::test]
    async fn test_reply_in_direct_message_is_plain() {
        let (conv, mut peer) = conversation("D1", &[]);
        conv.reply("done").await.unwrap();

        let frame = peer.next_outbound().await.unwrap();
        assert_eq!(frame.channel, "D1");
        assert_eq!(frame.text, "done");
    }
}
