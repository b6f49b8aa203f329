//! Consumer credentials and the per-survey launch policy.
//!
//! A [`LaunchPolicy`] is assembled by configuration and handed to the
//! orchestrator per invocation; the core never mutates it and holds no
//! process-wide settings state.

use std::fmt;

use zeroize::Zeroizing;

use crate::domain::attributes::AttributeMapping;
use crate::domain::token::TokenGenerator;

/// Domain error returned when consumer credentials are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerValidationError {
    /// Consumer key was missing or blank.
    EmptyKey,
    /// Shared secret was missing or blank.
    EmptySecret,
}

impl fmt::Display for ConsumerValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "consumer key must not be empty"),
            Self::EmptySecret => write!(f, "consumer secret must not be empty"),
        }
    }
}

impl std::error::Error for ConsumerValidationError {}

/// A launch consumer: the calling platform's key and shared secret.
///
/// The secret is only ever used locally to recompute signatures and is
/// wrapped so it is wiped from memory on drop. Keys are compared exactly;
/// no trimming or case folding is applied to either part.
///
/// # Examples
/// ```
/// use lti_gateway::domain::Consumer;
///
/// let consumer = Consumer::try_from_parts("K1", "S1").unwrap();
/// assert_eq!(consumer.key(), "K1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    key: String,
    secret: Zeroizing<String>,
}

impl Consumer {
    /// Construct a consumer from raw key/secret inputs.
    pub fn try_from_parts(key: &str, secret: &str) -> Result<Self, ConsumerValidationError> {
        if key.trim().is_empty() {
            return Err(ConsumerValidationError::EmptyKey);
        }
        if secret.trim().is_empty() {
            return Err(ConsumerValidationError::EmptySecret);
        }
        Ok(Self {
            key: key.to_owned(),
            secret: Zeroizing::new(secret.to_owned()),
        })
    }

    /// Provision a fresh consumer with a random key and secret.
    ///
    /// Shares the session-token entropy contract, mirroring how an initial
    /// key/secret pair is minted before it is handed to the platform
    /// administrator.
    #[must_use]
    pub fn provision(generator: &dyn TokenGenerator) -> Self {
        Self {
            key: generator.generate().into_string(),
            secret: Zeroizing::new(generator.generate().into_string()),
        }
    }

    /// Key the platform presents as `oauth_consumer_key`.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Shared secret used for signature recomputation.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.as_str()
    }
}

/// Per-survey launch configuration, read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPolicy {
    consumer: Consumer,
    mapping: AttributeMapping,
    allow_multiple_completions: bool,
}

impl LaunchPolicy {
    /// Assemble a policy for one survey.
    #[must_use]
    pub const fn new(
        consumer: Consumer,
        mapping: AttributeMapping,
        allow_multiple_completions: bool,
    ) -> Self {
        Self {
            consumer,
            mapping,
            allow_multiple_completions,
        }
    }

    /// Expected consumer credentials.
    #[must_use]
    pub const fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    /// Attribute-name configuration.
    #[must_use]
    pub const fn mapping(&self) -> &AttributeMapping {
        &self.mapping
    }

    /// Whether a learner may complete this survey more than once.
    #[must_use]
    pub const fn allow_multiple_completions(&self) -> bool {
        self.allow_multiple_completions
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::token::FixedTokenGenerator;
    use rstest::rstest;

    #[rstest]
    #[case("", "secret", ConsumerValidationError::EmptyKey)]
    #[case("  ", "secret", ConsumerValidationError::EmptyKey)]
    #[case("key", "", ConsumerValidationError::EmptySecret)]
    #[case("key", "   ", ConsumerValidationError::EmptySecret)]
    fn blank_credentials_are_rejected(
        #[case] key: &str,
        #[case] secret: &str,
        #[case] expected: ConsumerValidationError,
    ) {
        let err = Consumer::try_from_parts(key, secret).expect_err("blank parts must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn provision_draws_key_and_secret_from_the_generator() {
        let generator = FixedTokenGenerator::new("tok32chars");
        let consumer = Consumer::provision(&generator);
        assert_eq!(consumer.key(), "tok32chars");
        assert_eq!(consumer.secret(), "tok32chars");
    }
}
