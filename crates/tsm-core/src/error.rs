use std::fmt;

use thiserror::Error;

/// Result type alias using the engine's [`MatchError`].
pub type Result<T> = std::result::Result<T, MatchError>;

/// Which side of the market an agent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Proposers,
    Receivers,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Proposers => write!(f, "proposer"),
            Side::Receivers => write!(f, "receiver"),
        }
    }
}

/// Errors raised by profile validation, matching construction and the
/// stability verifier. Every variant names the offending agent(s) so bad
/// input can be pinpointed without inspecting engine internals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// A preference value is malformed (empty tier, duplicate entry, ...).
    #[error("{side} {agent}'s preference list is not a valid list: {reason}")]
    InvalidPreferenceList {
        side: Side,
        agent: String,
        reason: String,
    },

    /// A preference list names an agent outside the problem.
    #[error("{side} {owner}'s preference list includes {name}, who is not present in this problem")]
    UnknownAgent {
        side: Side,
        owner: String,
        name: String,
    },

    /// A tie was encountered where a strict preference list is required.
    #[error("preference lists must be strict: the tie {tier:?} in {agent}'s list implies {agent} is indifferent between its members")]
    NotStrict { agent: String, tier: Vec<String> },

    /// Bijectivity violated: one agent claimed by two partners.
    #[error("this is not a matching: {agent} is matched with both {first} and {second} at the same time")]
    NotAMatching {
        agent: String,
        first: String,
        second: String,
    },

    /// The matching's participants do not align with the supplied profile.
    #[error("matching is incompatible with the preference profile: {detail}")]
    IncompatiblePreferences { detail: String },

    /// A side's agent map itself is malformed (duplicate keys, ...).
    #[error("invalid preference profile: {reason}")]
    InvalidPreferenceProfile { reason: String },
}
