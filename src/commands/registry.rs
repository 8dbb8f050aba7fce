//! Command handler registry
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Qualified (multi-word) command names, alias folding and group lookup
//! - 1.0.0: Initial implementation for handler dispatch

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::handler::MessageCommandHandler;

/// Alternative spellings accepted for a single command word
const ALIASES: &[(&str, &str)] = &[
    ("metadata", "bot"),
    ("name", "username"),
    ("clear", "remove"),
    ("stream", "streaming"),
    ("twitch", "streaming"),
    ("game", "playing"),
    ("donotdisturb", "dnd"),
    ("busy", "dnd"),
    ("away", "idle"),
    ("afk", "idle"),
    ("offline", "invisible"),
];

/// Lowercase `word` and fold it onto its canonical spelling.
pub fn canonical_word(word: &str) -> String {
    let lower = word.to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(lower)
}

/// What a run of command words resolved to
#[derive(Clone)]
pub enum Target {
    Command(Arc<dyn MessageCommandHandler>),
    /// A name that only prefixes other commands, like `set bot`
    Group,
}

/// Result of [`CommandRegistry::resolve`]
#[derive(Clone)]
pub struct Resolved {
    /// Canonical qualified name, words joined by single spaces
    pub name: String,
    /// How many input words the name consumed
    pub consumed: usize,
    pub target: Target,
}

/// Registry mapping qualified command names to handlers
///
/// Names are lowercase and may contain spaces (`"set bot username"`); every
/// leading part of a name (`"set"`, `"set bot"`) becomes a group.
///
/// # Example
///
/// ```ignore
/// let mut registry = CommandRegistry::new();
/// registry.register(Arc::new(PingHandler));
///
/// if let Some(resolved) = registry.resolve(&["ping"]) {
///     // dispatch resolved.target
/// }
/// ```
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn MessageCommandHandler>>,
    groups: BTreeSet<String>,
}

impl CommandRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            groups: BTreeSet::new(),
        }
    }

    /// Register a handler for its declared command names
    ///
    /// The handler is registered for all names returned by `command_names()`.
    pub fn register(&mut self, handler: Arc<dyn MessageCommandHandler>) {
        for name in handler.command_names() {
            let words: Vec<&str> = name.split(' ').collect();
            for end in 1..words.len() {
                self.groups.insert(words[..end].join(" "));
            }
            self.handlers.insert(name, Arc::clone(&handler));
        }
    }

    /// Get handler for an exact qualified name
    pub fn get(&self, name: &str) -> Option<Arc<dyn MessageCommandHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Check if a command is registered
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Check if `name` prefixes at least one registered command
    pub fn is_group(&self, name: &str) -> bool {
        self.groups.contains(name)
    }

    /// Next words available below `group`, sorted
    pub fn subcommands(&self, group: &str) -> Vec<String> {
        let prefix = format!("{group} ");
        let words: BTreeSet<String> = self
            .handlers
            .keys()
            .map(|name| &**name)
            .chain(self.groups.iter().map(String::as_str))
            .filter_map(|name| name.strip_prefix(&prefix))
            .filter_map(|rest| rest.split(' ').next())
            .map(str::to_string)
            .collect();
        words.into_iter().collect()
    }

    /// Resolve the longest registered name at the start of `words`.
    ///
    /// Each word is folded through [`canonical_word`] before matching. A
    /// command beats a group of the same length.
    pub fn resolve(&self, words: &[&str]) -> Option<Resolved> {
        let mut best = None;
        let mut name = String::new();

        for (index, word) in words.iter().enumerate() {
            if index > 0 {
                name.push(' ');
            }
            name.push_str(&canonical_word(word));

            if let Some(handler) = self.handlers.get(name.as_str()) {
                best = Some(Resolved {
                    name: name.clone(),
                    consumed: index + 1,
                    target: Target::Command(Arc::clone(handler)),
                });
            } else if self.groups.contains(&name) {
                best = Some(Resolved {
                    name: name.clone(),
                    consumed: index + 1,
                    target: Target::Group,
                });
            } else {
                break;
            }
        }

        best
    }

    /// Number of registered command names
    ///
    /// Note: This counts command names, not unique handlers.
    /// A handler registered for multiple names will be counted multiple times.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Get all registered command names
    pub fn command_names(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::context::CommandContext;
    use crate::commands::parser::Invocation;
    use anyhow::Result;
    use async_trait::async_trait;
    use serenity::model::channel::Message;
    use serenity::prelude::Context;

    // Mock handler for testing
    struct MockHandler {
        names: &'static [&'static str],
    }

    #[async_trait]
    impl MessageCommandHandler for MockHandler {
        fn command_names(&self) -> &'static [&'static str] {
            self.names
        }

        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            _serenity_ctx: &Context,
            _msg: &Message,
            _invocation: &Invocation,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn core_like() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(MockHandler {
            names: &["set bot username", "set bot avatar", "set bot avatar remove"],
        }));
        registry.register(Arc::new(MockHandler {
            names: &["set status playing", "set status dnd"],
        }));
        registry.register(Arc::new(MockHandler { names: &["ping"] }));
        registry
    }

    #[test]
    fn test_registry_new_is_empty() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_registry_register_multiple_names() {
        let registry = core_like();

        assert_eq!(registry.len(), 6);
        assert!(registry.contains("ping"));
        assert!(registry.contains("set bot avatar remove"));
        assert!(!registry.contains("set"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_groups_are_derived_from_names() {
        let registry = core_like();

        assert!(registry.is_group("set"));
        assert!(registry.is_group("set bot"));
        assert!(registry.is_group("set status"));
        // A command that also prefixes another command is both
        assert!(registry.is_group("set bot avatar"));
        assert!(!registry.is_group("ping"));
    }

    #[test]
    fn test_subcommands_lists_next_words() {
        let registry = core_like();

        assert_eq!(registry.subcommands("set"), vec!["bot", "status"]);
        assert_eq!(registry.subcommands("set bot"), vec!["avatar", "username"]);
        assert!(registry.subcommands("ping").is_empty());
    }

    #[test]
    fn test_resolve_longest_match() {
        let registry = core_like();

        let resolved = registry
            .resolve(&["set", "bot", "avatar", "https://x"])
            .unwrap();
        assert_eq!(resolved.name, "set bot avatar");
        assert_eq!(resolved.consumed, 3);
        assert!(matches!(resolved.target, Target::Command(_)));

        let resolved = registry.resolve(&["set", "bot", "avatar", "remove"]).unwrap();
        assert_eq!(resolved.name, "set bot avatar remove");
        assert_eq!(resolved.consumed, 4);
    }

    #[test]
    fn test_resolve_group_without_subcommand() {
        let registry = core_like();

        let resolved = registry.resolve(&["set", "bot"]).unwrap();
        assert_eq!(resolved.name, "set bot");
        assert!(matches!(resolved.target, Target::Group));

        // Unknown subcommand stops at the group
        let resolved = registry.resolve(&["set", "bogus", "x"]).unwrap();
        assert_eq!(resolved.name, "set");
        assert_eq!(resolved.consumed, 1);
    }

    #[test]
    fn test_resolve_folds_aliases_and_case() {
        let registry = core_like();

        let resolved = registry.resolve(&["SET", "metadata", "name", "Bob"]).unwrap();
        assert_eq!(resolved.name, "set bot username");
        assert_eq!(resolved.consumed, 3);

        let resolved = registry.resolve(&["set", "bot", "avatar", "clear"]).unwrap();
        assert_eq!(resolved.name, "set bot avatar remove");

        let resolved = registry.resolve(&["set", "status", "busy"]).unwrap();
        assert_eq!(resolved.name, "set status dnd");

        let resolved = registry.resolve(&["set", "status", "game", "chess"]).unwrap();
        assert_eq!(resolved.name, "set status playing");
        assert_eq!(resolved.consumed, 3);
    }

    #[test]
    fn test_resolve_unknown_command() {
        let registry = core_like();
        assert!(registry.resolve(&["pong"]).is_none());
        assert!(registry.resolve(&[]).is_none());
    }

    #[test]
    fn test_canonical_word() {
        assert_eq!(canonical_word("AFK"), "idle");
        assert_eq!(canonical_word("twitch"), "streaming");
        assert_eq!(canonical_word("Offline"), "invisible");
        assert_eq!(canonical_word("Ping"), "ping");
    }

    #[test]
    fn test_registry_default() {
        let registry = CommandRegistry::default();
        assert!(registry.is_empty());
    }
}
