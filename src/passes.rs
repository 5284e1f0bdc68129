//! Vocabulary of transformation passes understood by the optimization engine
//!
//! Each token is an atomic ABC command. The no-op token is part of the
//! vocabulary on purpose: it lets the sampler discover that shorter
//! sequences are sometimes better without a separate length parameter.

use std::fmt;

/// A candidate sequence of passes, one token per position
pub type Sequence = Vec<PassToken>;

/// A named transformation pass, or the identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassToken {
    /// Identity, leaves the graph untouched
    Noop,
    /// Depth reduction by tree balancing
    Balance,
    /// Cut-based rewriting
    Rewrite,
    /// Cut-based rewriting, allowing zero-cost replacements
    RewriteZ,
    /// Resubstitution
    Resub,
    /// Resubstitution with 6-input cuts
    ResubK6,
    /// Combinational optimization with don't-cares
    Dc2,
    /// Choice computation followed by mapping
    Dch,
    /// The classic balance/rewrite/refactor script
    Resyn2,
}

impl PassToken {
    /// All tokens the sampler can pick from, no-op first
    pub const ALL: [PassToken; 9] = [
        PassToken::Noop,
        PassToken::Balance,
        PassToken::Rewrite,
        PassToken::RewriteZ,
        PassToken::Resub,
        PassToken::ResubK6,
        PassToken::Dc2,
        PassToken::Dch,
        PassToken::Resyn2,
    ];

    /// Engine command for the token, or None for the no-op
    pub fn command(self) -> Option<&'static str> {
        use PassToken::*;
        match self {
            Noop => None,
            Balance => Some("balance"),
            Rewrite => Some("rewrite"),
            RewriteZ => Some("rewrite -z"),
            Resub => Some("resub"),
            ResubK6 => Some("resub -K 6"),
            Dc2 => Some("dc2"),
            Dch => Some("dch"),
            Resyn2 => Some("resyn2"),
        }
    }

    /// Whether the token is the identity
    pub fn is_noop(self) -> bool {
        self == PassToken::Noop
    }
}

impl fmt::Display for PassToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command().unwrap_or("noop"))
    }
}

/// Engine commands for a sequence, with no-op tokens removed
pub fn effective_commands(seq: &[PassToken]) -> Vec<&'static str> {
    seq.iter().filter_map(|t| t.command()).collect()
}
