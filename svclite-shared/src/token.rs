//! One-time attach tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Single-use credential proving a spawned process is the expected attach
/// target for a record.
///
/// Minted once at record creation; the broker accepts each token at most
/// once. A re-spawn always goes through a fresh record with a fresh token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachToken(String);

impl AttachToken {
    /// Mint a fresh opaque token.
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl fmt::Display for AttachToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = AttachToken::mint();
        let b = AttachToken::mint();
        assert_ne!(a, b);
    }

    #[test]
    fn test_matches_own_text_form() {
        let token = AttachToken::mint();
        assert!(token.matches(token.as_str()));
        assert!(!token.matches("something-else"));
    }
}
