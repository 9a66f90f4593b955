//! Template patterns - the default command matcher
//!
//! A template is a sequence of whitespace separated words. Plain words match
//! literally, `<name>` / `<name:string>` capture one word and `<name:integer>`
//! captures a signed integer. The whole text has to match.

use regex_lite::Regex;
use crate::application::errors::CommandError;
use crate::domain::traits::{Matcher, Parameters};

/// Compiled command template such as `deploy <env>` or `add <a:integer> <b:integer>`
#[derive(Debug, Clone)]
pub struct TemplatePattern {
    text: String,
    regex: Regex,
}

impl TemplatePattern {
    pub fn new(text: impl Into<String>) -> Result<Self, CommandError> {
        let text = text.into();
        let invalid = |reason: &str| CommandError::InvalidPattern {
            pattern: text.clone(),
            reason: reason.to_string(),
        };

        if text.trim().is_empty() {
            return Err(invalid("empty pattern"));
        }

        let mut source = String::from(r"^\s*");
        let mut names = Vec::new();
        for (i, word) in text.split_whitespace().enumerate() {
            if i > 0 {
                source.push_str(r"\s+");
            }
            source.push_str(&compile_word(word, &mut names).map_err(|reason| invalid(&reason))?);
        }
        source.push_str(r"\s*$");

        let regex = Regex::new(&source).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self { text, regex })
    }
}

fn compile_word(word: &str, names: &mut Vec<String>) -> Result<String, String> {
    let Some(inner) = word.strip_prefix('<') else {
        return Ok(regex_lite::escape(word));
    };
    let Some(inner) = inner.strip_suffix('>') else {
        return Err(format!("unterminated parameter '{}'", word));
    };

    let (name, kind) = inner.split_once(':').unwrap_or((inner, "string"));
    let valid_name = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_name {
        return Err(format!("invalid parameter name '{}'", name));
    }
    if names.iter().any(|seen| seen == name) {
        return Err(format!("duplicate parameter '{}'", name));
    }
    names.push(name.to_string());

    let body = match kind {
        "string" => r"\S+",
        "integer" => r"[-+]?\d+",
        other => return Err(format!("unknown parameter type '{}'", other)),
    };
    Ok(format!("(?P<{}>{})", name, body))
}

impl Matcher for TemplatePattern {
    fn text(&self) -> &str {
        &self.text
    }

    fn matches(&self, input: &str) -> Option<Parameters> {
        let caps = self.regex.captures(input)?;
        let params = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();
        Some(params)
    }
}
