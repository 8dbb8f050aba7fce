//! Addressable configuration scopes

use std::fmt;

/// The kind of entity a configuration value is attached to.
///
/// Each scope needs a fixed number of identifying keys: none for the
/// process-wide scope, one for guilds, channels, roles and users, and two
/// (guild then user) for guild members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeKind {
    Global,
    Guild,
    Channel,
    Role,
    User,
    Member,
}

impl ScopeKind {
    /// All scopes in declaration order
    pub const ALL: [ScopeKind; 6] = [
        ScopeKind::Global,
        ScopeKind::Guild,
        ScopeKind::Channel,
        ScopeKind::Role,
        ScopeKind::User,
        ScopeKind::Member,
    ];

    /// Number of scope keys required to address one entity of this scope
    pub const fn arity(self) -> usize {
        match self {
            ScopeKind::Global => 0,
            ScopeKind::Guild | ScopeKind::Channel | ScopeKind::Role | ScopeKind::User => 1,
            ScopeKind::Member => 2,
        }
    }

    /// Top-level key of this scope in a settings document
    pub const fn name(self) -> &'static str {
        match self {
            ScopeKind::Global => "GLOBAL",
            ScopeKind::Guild => "GUILD",
            ScopeKind::Channel => "CHANNEL",
            ScopeKind::Role => "ROLE",
            ScopeKind::User => "USER",
            ScopeKind::Member => "MEMBER",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
