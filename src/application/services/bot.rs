//! Bot - owns the session connection and runs the receive loop

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use crate::application::errors::{BotError, CommandError, TransportError};
use crate::application::messaging::{Connection, Dispatcher, TemplatePattern};
use crate::domain::entities::{Command, CommandHandler, HELP_KEYWORD};
use crate::domain::traits::{FrameStream, Transport};
use super::command_service::CommandService;
use super::keepalive::{ack_channel, KeepaliveMonitor, KeepaliveSettings};

/// Default bound on concurrently running dispatches
pub const DEFAULT_MAX_CONCURRENT: usize = 64;

/// Grace period for the keepalive monitor to report why it closed the connection
const MONITOR_REPORT_GRACE: Duration = Duration::from_secs(1);

/// A connected session with its registered commands
pub struct Bot {
    id: String,
    connection: Connection,
    stream: Box<dyn FrameStream>,
    commands: CommandService,
    keepalive: KeepaliveSettings,
    help_keyword: String,
    max_concurrent: usize,
}

impl Bot {
    /// Wrap an opened transport for the session identity `id`
    pub fn new(id: impl Into<String>, transport: Transport) -> Self {
        Self {
            id: id.into(),
            connection: Connection::new(transport.sink),
            stream: transport.stream,
            commands: CommandService::new(),
            keepalive: KeepaliveSettings::default(),
            help_keyword: HELP_KEYWORD.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    pub fn with_keepalive(mut self, settings: KeepaliveSettings) -> Self {
        self.keepalive = settings;
        self
    }

    pub fn with_help_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.help_keyword = keyword.into();
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Session identity assigned by the service
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Handle to the shared write half
    pub fn connection(&self) -> Connection {
        self.connection.clone()
    }

    pub fn commands(&self) -> &CommandService {
        &self.commands
    }

    /// Register a pre-built command
    pub fn register(&mut self, command: Command) {
        self.commands.register(command);
    }

    /// Register a handler for a template pattern such as `deploy <env>`
    pub fn register_command<H>(&mut self, pattern: &str, description: &str, handler: H) -> Result<(), CommandError>
    where
        H: CommandHandler + 'static,
    {
        let pattern = TemplatePattern::new(pattern)?;
        self.register(Command::new(pattern, handler).with_description(description));
        Ok(())
    }

    /// Register a handler without a help description
    pub fn command<H>(&mut self, pattern: &str, handler: H) -> Result<(), CommandError>
    where
        H: CommandHandler + 'static,
    {
        self.register_command(pattern, "", handler)
    }

    /// Run the session until the connection ends.
    ///
    /// Returns `Ok(())` when the service hung up. Otherwise the error says why
    /// the session ended: a failed read, or the keepalive failure that closed
    /// the connection. The connection is closed and no background task
    /// outlives this call.
    pub async fn listen(self) -> Result<(), BotError> {
        let Bot {
            id,
            connection,
            mut stream,
            commands,
            keepalive,
            help_keyword,
            max_concurrent,
        } = self;

        tracing::info!("Listening as {} with {} commands", id, commands.len());

        let dispatcher = Dispatcher::new(id, Arc::new(commands), connection.clone())
            .with_help_keyword(help_keyword);
        let (ack_tx, ack_rx) = ack_channel();
        let mut monitor = tokio::spawn(KeepaliveMonitor::new(connection.clone(), ack_rx, keepalive).run());
        let limiter = Arc::new(Semaphore::new(max_concurrent));
        let mut tasks = JoinSet::new();

        let outcome = loop {
            let frame = tokio::select! {
                biased;
                _ = connection.closed() => break Err(None),
                frame = stream.receive() => frame,
            };

            match frame {
                Ok(message) if message.is_pong() => {
                    if !ack_tx.signal(message.acknowledged_id()) {
                        tracing::debug!("Dropped acknowledgment {}, one is already pending", message.acknowledged_id());
                    }
                }
                Ok(message) => {
                    tracing::debug!("Frame `{}` in [{}]", message.kind, message.channel);
                    let dispatcher = dispatcher.clone();
                    let limiter = Arc::clone(&limiter);
                    tasks.spawn(async move {
                        let Ok(_permit) = limiter.acquire_owned().await else {
                            return;
                        };
                        dispatcher.process(message).await;
                    });
                }
                Err(TransportError::Codec(e)) => {
                    tracing::warn!("Skipping undecodable frame: {}", e);
                }
                Err(TransportError::Closed) => {
                    tracing::info!("Connection closed by peer");
                    break Ok(());
                }
                Err(e) => break Err(Some(BotError::ReadFailed(e.to_string()))),
            }

            while tasks.try_join_next().is_some() {}
        };

        connection.close().await;
        drop(ack_tx);
        tasks.abort_all();

        let result = match outcome {
            Ok(()) => Ok(()),
            Err(Some(e)) => Err(e),
            Err(None) => match tokio::time::timeout(MONITOR_REPORT_GRACE, &mut monitor).await {
                Ok(Ok(Err(e))) => Err(e),
                _ => Err(BotError::ReadFailed("connection closed".to_string())),
            },
        };
        monitor.abort();

        while tasks.join_next().await.is_some() {}
        match &result {
            Ok(()) => tracing::info!("Session ended"),
            Err(e) => tracing::warn!("Session ended: {}", e),
        }
        result
    }
}
