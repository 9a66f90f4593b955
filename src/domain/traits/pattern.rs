use std::collections::HashMap;

/// Named values captured by a successful match
pub type Parameters = HashMap<String, String>;

/// Pattern matching capability consumed by the command registry.
///
/// The expression syntax is owned by the implementation; the registry only
/// needs the source text (for help output) and a match result.
pub trait Matcher: Send + Sync {
    /// Literal pattern text as registered
    fn text(&self) -> &str;

    /// Parameters when `input` matches, `None` otherwise
    fn matches(&self, input: &str) -> Option<Parameters>;
}
