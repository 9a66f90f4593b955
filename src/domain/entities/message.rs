use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Frame type of ordinary content frames
pub const MESSAGE_TYPE: &str = "message";
/// Frame type of heartbeats sent by the bot
pub const PING_TYPE: &str = "ping";
/// Frame type of heartbeat acknowledgments
pub const PONG_TYPE: &str = "pong";
/// Reserved keyword that asks the bot for its command list
pub const HELP_KEYWORD: &str = "help";

/// Direct message channels live in their own id namespace
const DIRECT_CHANNEL_PREFIX: char = 'D';

/// `<http://example.com|example.com>` or `<mailto:a@b.c>`
static LINK_MARKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<((?:https?|mailto):[^|>]+)(?:\|[^>]*)?>").expect("link markup regex is valid")
});

/// A frame exchanged over the streaming connection.
///
/// Absent fields decode to their zero values, unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Message {
    #[serde(skip_serializing_if = "is_zero")]
    pub id: u64,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub channel: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<u64>,
}

fn is_zero(id: &u64) -> bool {
    *id == 0
}

/// Mention token the service uses to reference a user
pub fn mention(user: &str) -> String {
    format!("<@{}>", user)
}

impl Message {
    /// Content frame addressed to a channel
    pub fn text(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: MESSAGE_TYPE.to_string(),
            channel: channel.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Heartbeat frame carrying a correlation id
    pub fn ping(id: u64) -> Self {
        Self {
            id,
            kind: PING_TYPE.to_string(),
            ..Self::default()
        }
    }

    /// Acknowledgment for the heartbeat with the given id
    pub fn pong(reply_to: u64) -> Self {
        Self {
            kind: PONG_TYPE.to_string(),
            reply_to: Some(reply_to),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Ordinary content frame (typed `message` or untyped)
    pub fn is_message(&self) -> bool {
        self.kind.is_empty() || self.kind == MESSAGE_TYPE
    }

    pub fn is_pong(&self) -> bool {
        self.kind == PONG_TYPE
    }

    /// Correlation id acknowledged by a pong frame
    pub fn acknowledged_id(&self) -> u64 {
        self.reply_to.unwrap_or(self.id)
    }

    pub fn is_from(&self, user: &str) -> bool {
        self.user == user
    }

    pub fn is_direct_message(&self) -> bool {
        self.channel.starts_with(DIRECT_CHANNEL_PREFIX)
    }

    pub fn is_mention_for(&self, user: &str) -> bool {
        self.text.contains(&mention(user))
    }

    /// Content addressed to `self_id`: a direct message, or a mention in a channel.
    /// Frames authored by `self_id` are never relevant.
    pub fn is_relevant_for(&self, self_id: &str) -> bool {
        self.is_message()
            && !self.is_from(self_id)
            && (self.is_direct_message() || self.is_mention_for(self_id))
    }

    /// Remove leading mentions of `self_id` (and a trailing `:`), leaving the request text.
    pub fn strip_mention(&mut self, self_id: &str) {
        let token = mention(self_id);
        let mut rest = self.text.as_str();
        while let Some(stripped) = rest.strip_prefix(token.as_str()) {
            rest = stripped.strip_prefix(':').unwrap_or(stripped).trim_start();
        }
        if rest.len() != self.text.len() {
            self.text = rest.to_string();
        }
    }

    /// Replace `<url|label>` link decorations with the bare url
    pub fn strip_link_markup(&mut self) {
        let stripped = LINK_MARKUP.replace_all(&self.text, "$1").into_owned();
        self.text = stripped;
    }

    pub fn is_help_request(&self) -> bool {
        self.is_help_request_for(HELP_KEYWORD)
    }

    pub fn is_help_request_for(&self, keyword: &str) -> bool {
        self.text.trim().eq_ignore_ascii_case(keyword)
    }

    /// Content reply in the originating channel
    pub fn reply(&self, text: impl Into<String>) -> Self {
        Self::text(self.channel.clone(), text)
    }
}
