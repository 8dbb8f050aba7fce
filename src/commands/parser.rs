//! Prefix matching and invocation parsing
//!
//! Turns message text into a [`PrefixMatch`] and then, with the help of a
//! [`CommandRegistry`], into an [`Invocation`]. Argument text keeps the
//! author's original spacing and case.

use serenity::model::id::UserId;

use super::registry::{CommandRegistry, Resolved};

/// A prefix found at the start of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatch<'a> {
    /// The prefix as typed
    pub prefix: String,
    pub is_mention: bool,
    /// Everything after the prefix
    pub rest: &'a str,
}

/// A resolved command call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub prefix: String,
    /// Canonical qualified command name
    pub command: String,
    args: String,
}

impl Invocation {
    pub fn new(prefix: impl Into<String>, command: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            command: command.into(),
            args: args.into(),
        }
    }

    /// Raw argument text, trimmed
    pub fn args(&self) -> &str {
        &self.args
    }

    /// Arguments split on whitespace
    pub fn arg_list(&self) -> Vec<&str> {
        self.args.split_whitespace().collect()
    }

    /// `prefix` + command, for usage lines and help replies
    pub fn qualified(&self) -> String {
        format!("{}{}", self.prefix, self.command)
    }
}

/// Whitespace-separated words with their byte offsets
pub fn tokenize(text: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start = None;

    for (offset, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(begin)) => {
                tokens.push((begin, &text[begin..offset]));
                start = None;
            }
            (false, None) => start = Some(offset),
            _ => {}
        }
    }
    if let Some(begin) = start {
        tokens.push((begin, &text[begin..]));
    }

    tokens
}

/// Find the prefix `content` starts with.
///
/// Mentions of `bot_id` always count. Of the configured `prefixes`, the
/// longest match wins; empty prefixes are ignored.
pub fn find_prefix<'a>(
    content: &'a str,
    prefixes: &[String],
    bot_id: UserId,
) -> Option<PrefixMatch<'a>> {
    for mention in [format!("<@{}>", bot_id.0), format!("<@!{}>", bot_id.0)] {
        if let Some(rest) = content.strip_prefix(mention.as_str()) {
            return Some(PrefixMatch {
                prefix: format!("{mention} "),
                is_mention: true,
                rest: rest.trim_start(),
            });
        }
    }

    let mut candidates: Vec<&String> = prefixes.iter().filter(|p| !p.is_empty()).collect();
    candidates.sort_by(|a, b| b.len().cmp(&a.len()));

    candidates.into_iter().find_map(|prefix| {
        content.strip_prefix(prefix.as_str()).map(|rest| PrefixMatch {
            prefix: prefix.clone(),
            is_mention: false,
            rest,
        })
    })
}

/// Resolve the command after a matched prefix.
///
/// The command name must follow a text prefix directly (`!ping`, not
/// `! ping`).
pub fn parse_invocation(
    matched: &PrefixMatch<'_>,
    registry: &CommandRegistry,
) -> Option<(Invocation, Resolved)> {
    let tokens = tokenize(matched.rest);
    let first = tokens.first()?;
    if first.0 != 0 && !matched.is_mention {
        return None;
    }

    let words: Vec<&str> = tokens.iter().map(|(_, word)| *word).collect();
    let resolved = registry.resolve(&words)?;

    let args = tokens
        .get(resolved.consumed)
        .map(|(offset, _)| matched.rest[*offset..].trim_end())
        .unwrap_or("");

    let invocation = Invocation::new(matched.prefix.clone(), resolved.name.clone(), args);
    Some((invocation, resolved))
}
