//! Message dispatcher - Routes relevant messages to help or matching commands

use std::sync::Arc;
use crate::application::services::CommandService;
use crate::domain::entities::{Message, HELP_KEYWORD};
use super::connection::Connection;
use super::conversation::Conversation;

/// Processes content frames on behalf of one session
#[derive(Clone)]
pub struct Dispatcher {
    self_id: String,
    help_keyword: String,
    commands: Arc<CommandService>,
    connection: Connection,
}

impl Dispatcher {
    pub fn new(self_id: impl Into<String>, commands: Arc<CommandService>, connection: Connection) -> Self {
        Self {
            self_id: self_id.into(),
            help_keyword: HELP_KEYWORD.to_string(),
            commands,
            connection,
        }
    }

    pub fn with_help_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.help_keyword = keyword.into();
        self
    }

    /// Handle one inbound content frame. Returns the number of handlers invoked.
    pub async fn process(&self, mut message: Message) -> usize {
        if !message.is_relevant_for(&self.self_id) {
            return 0;
        }

        message.strip_mention(&self.self_id);
        message.strip_link_markup();

        if message.is_help_request_for(&self.help_keyword) {
            self.send_help(&message).await;
            0
        } else {
            self.dispatch(&message).await
        }
    }

    /// Invoke every command whose pattern matches the message text
    pub async fn dispatch(&self, message: &Message) -> usize {
        let mut invoked = 0;
        for (cmd, params) in self.commands.matching(&message.text) {
            tracing::debug!("[{}] `{}` matched", message.channel, cmd.text());
            let conversation = Conversation::new(params, message.clone(), self.connection.clone());
            if let Err(e) = cmd.handler().handle(conversation).await {
                tracing::warn!("[{}] Command `{}` failed: {}", message.channel, cmd.text(), e);
            }
            invoked += 1;
        }
        invoked
    }

    async fn send_help(&self, request: &Message) {
        let help = self.commands.get_help(request);
        if let Err(e) = self.connection.send(&request.reply(help)).await {
            tracing::warn!("[{}] Unable to send help: {}", request.channel, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::application::errors::CommandError;
    use crate::application::messaging::TemplatePattern;
    use crate::domain::entities::Command;
    use crate::infrastructure::adapters::memory;

    fn counting(pattern: &str, counter: Arc<AtomicUsize>) -> Command {
        Command::new(TemplatePattern::new(pattern).unwrap(), move |_conv: Conversation| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), CommandError>(())
            }
        })
    }

    fn dispatcher(commands: CommandService) -> (Dispatcher, memory::MemoryPeer) {
        let (transport, peer) = memory::channel();
        let connection = Connection::new(transport.sink);
        (Dispatcher::new("UBOT", Arc::new(commands), connection), peer)
    }

    #[tokio::test]
    async fn test_hello_invokes_handler_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut commands = CommandService::new();
        commands.register(counting("hello", hits.clone()));
        let (dispatcher, _peer) = dispatcher(commands);

        assert_eq!(dispatcher.process(Message::text("D1", "hello").with_user("U1")).await, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert_eq!(dispatcher.process(Message::text("D1", "goodbye").with_user("U1")).await, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_overlapping_patterns_all_invoked() {
        let generic = Arc::new(AtomicUsize::new(0));
        let specific = Arc::new(AtomicUsize::new(0));
        let mut commands = CommandService::new();
        commands.register(counting("deploy <env>", generic.clone()));
        commands.register(counting("deploy production", specific.clone()));
        let (dispatcher, _peer) = dispatcher(commands);

        let invoked = dispatcher
            .process(Message::text("C1", "<@UBOT> deploy production").with_user("U1"))
            .await;
        assert_eq!(invoked, 2);
        assert_eq!(generic.load(Ordering::SeqCst), 1);
        assert_eq!(specific.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_irrelevant_message_has_no_effect() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut commands = CommandService::new();
        commands.register(counting("hello", hits.clone()));
        let (dispatcher, mut peer) = dispatcher(commands);

        assert_eq!(dispatcher.process(Message::text("C1", "hello").with_user("U1")).await, 0);
        assert_eq!(dispatcher.process(Message::text("C1", "help").with_user("U1")).await, 0);
        assert_eq!(dispatcher.process(Message::text("D1", "hello").with_user("UBOT")).await, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(peer.try_outbound().is_none());
    }

    #[tokio::test]
    async fn test_help_request_replies_with_listing() {
        let (dispatcher, mut peer) = dispatcher(CommandService::new());

        dispatcher.process(Message::text("C1", "<@UBOT> help").with_user("U1")).await;
        let reply = peer.next_outbound().await.unwrap();
        assert_eq!(reply.channel, "C1");
        assert!(reply.text.starts_with("<@U1>: Thanks for asking!"));

        dispatcher.process(Message::text("D1", "help").with_user("U1")).await;
        let reply = peer.next_outbound().await.unwrap();
        assert!(reply.text.starts_with("Thanks for asking!"));
    }

    #[tokio::test]
    async fn test_link_markup_stripped_before_matching() {
        let mut commands = CommandService::new();
        commands.register(Command::new(
            TemplatePattern::new("open <url>").unwrap(),
            |conv: Conversation| async move {
                let url = conv.string("url")?.to_string();
                conv.reply(url).await
            },
        ));
        let (dispatcher, mut peer) = dispatcher(commands);

        dispatcher
            .process(Message::text("D1", "open <https://example.com|example.com>").with_user("U1"))
            .await;
        assert_eq!(peer.next_outbound().await.unwrap().text, "https://example.com");
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_others() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut commands = CommandService::new();
        commands.register(Command::new(
            TemplatePattern::new("hello").unwrap(),
            |_conv: Conversation| async {
                Err::<(), _>(CommandError::ExecutionFailed("boom".to_string()))
            },
        ));
        commands.register(counting("hello", hits.clone()));
        let (dispatcher, _peer) = dispatcher(commands);

        assert_eq!(dispatcher.process(Message::text("D1", "hello").with_user("U1")).await, 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
