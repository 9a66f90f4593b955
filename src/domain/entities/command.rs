use std::future::Future;
use std::sync::Arc;
use async_trait::async_trait;
use crate::application::errors::CommandError;
use crate::application::messaging::Conversation;
use crate::domain::traits::{Matcher, Parameters};

/// Capability invoked when a command's pattern matches.
///
/// Implemented for any `Fn(Conversation) -> impl Future<Output = Result<(), CommandError>>`.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, conversation: Conversation) -> Result<(), CommandError>;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(Conversation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    async fn handle(&self, conversation: Conversation) -> Result<(), CommandError> {
        (self)(conversation).await
    }
}

/// Represents a bot command
pub struct Command {
    pattern: Box<dyn Matcher>,
    description: String,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn new<M, H>(pattern: M, handler: H) -> Self
    where
        M: Matcher + 'static,
        H: CommandHandler + 'static,
    {
        Self {
            pattern: Box::new(pattern),
            description: String::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Pattern text as registered
    pub fn text(&self) -> &str {
        self.pattern.text()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn handler(&self) -> Arc<dyn CommandHandler> {
        Arc::clone(&self.handler)
    }

    pub fn matches(&self, input: &str) -> Option<Parameters> {
        self.pattern.matches(input)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("pattern", &self.text())
            .field("description", &self.description)
            .finish()
    }
}

/// Ordered command list. Registration order drives both help output and match evaluation.
#[derive(Default, Debug)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command. Duplicate patterns are kept and all of them are tried.
    pub fn register(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn all(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Every command whose pattern matches `input`, in registration order
    pub fn matching<'a>(&'a self, input: &'a str) -> impl Iterator<Item = (&'a Command, Parameters)> + 'a {
        self.commands
            .iter()
            .filter_map(move |cmd| cmd.matches(input).map(|params| (cmd, params)))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exact(&'static str);

    impl Matcher for Exact {
        fn text(&self) -> &str {
            self.0
        }

        fn matches(&self, input: &str) -> Option<Parameters> {
            (input == self.0).then(Parameters::new)
        }
    }

    fn noop(_conversation: Conversation) -> impl Future<Output = Result<(), CommandError>> {
        async { Ok(()) }
    }

    #[test]
    fn test_registry_keeps_order_and_duplicates() {
        let mut registry = CommandRegistry::new();
        registry.register(Command::new(Exact("b"), noop));
        registry.register(Command::new(Exact("a"), noop).with_description("first a"));
        registry.register(Command::new(Exact("a"), noop).with_description("second a"));

        let texts: Vec<&str> = registry.all().map(|c| c.text()).collect();
        assert_eq!(texts, vec!["b", "a", "a"]);
        assert_eq!(registry.len(), 3);

        let matched: Vec<&str> = registry.matching("a").map(|(c, _)| c.description()).collect();
        assert_eq!(matched, vec!["first a", "second a"]);
    }

    #[test]
    fn test_registry_no_match() {
        let mut registry = CommandRegistry::new();
        assert!(registry.is_empty());
        registry.register(Command::new(Exact("hello"), noop));
        assert_eq!(registry.matching("goodbye").count(), 0);
    }
}
