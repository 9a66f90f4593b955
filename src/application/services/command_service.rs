use crate::domain::entities::{mention, Command, CommandRegistry, Message};
use crate::domain::traits::Parameters;

/// Greeting that opens every help listing
pub const HELP_GREETING: &str = "Thanks for asking! I can support you with those features:\n\n";

/// Service for managing and rendering registered commands
#[derive(Default, Debug)]
pub struct CommandService {
    registry: CommandRegistry,
}

impl CommandService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Command) {
        tracing::debug!("Registered command `{}`", command.text());
        self.registry.register(command);
    }

    /// Commands matching `text`, in registration order
    pub fn matching<'a>(&'a self, text: &'a str) -> impl Iterator<Item = (&'a Command, Parameters)> + 'a {
        self.registry.matching(text)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Help listing for a request. Requests outside direct messages get the sender mentioned.
    pub fn get_help(&self, request: &Message) -> String {
        let mut help = HELP_GREETING.to_string();
        for cmd in self.registry.all() {
            help.push_str(&format!("`{}`", cmd.text()));
            if !cmd.description().is_empty() {
                help.push_str(&format!(" *–* {}", cmd.description()));
            }
            help.push('\n');
        }

        if !request.is_direct_message() {
            help = format!("{}: {}", mention(&request.user), help);
        }
        help
    }
}
