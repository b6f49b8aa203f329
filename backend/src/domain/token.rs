//! Session token generation.
//!
//! Token generation is a port so the orchestrator never reaches for ambient
//! randomness: callers inject a generator, tests inject a deterministic one.

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;

use crate::domain::session::SessionToken;

/// Number of alphanumeric characters in a generated token.
///
/// 62^32 is just under 2^191 possibilities, comfortably above the 128-bit
/// minimum the token contract requires.
const TOKEN_LENGTH: usize = 32;

/// Source of opaque session tokens.
///
/// ## Contract
/// - Tokens must carry at least 128 bits of entropy from a
///   cryptographically strong source.
/// - Generation must be safe to call from concurrent request handlers.
pub trait TokenGenerator: Send + Sync {
    /// Mint a fresh token.
    fn generate(&self) -> SessionToken;
}

/// Production generator drawing from the operating system's CSPRNG.
///
/// # Examples
/// ```
/// use lti_gateway::domain::{OsRngTokenGenerator, TokenGenerator};
///
/// let token = OsRngTokenGenerator.generate();
/// assert_eq!(token.as_str().len(), 32);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRngTokenGenerator;

impl TokenGenerator for OsRngTokenGenerator {
    fn generate(&self) -> SessionToken {
        let value: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        SessionToken::new(value)
    }
}

/// Deterministic generator for tests that need a known token.
#[derive(Debug, Clone)]
pub struct FixedTokenGenerator {
    value: String,
}

impl FixedTokenGenerator {
    /// Always generate `value`.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl TokenGenerator for FixedTokenGenerator {
    fn generate(&self) -> SessionToken {
        SessionToken::new(self.value.clone())
    }
}
