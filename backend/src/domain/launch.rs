//! Inbound launch request model and LTI protocol literals.
//!
//! A [`LaunchRequest`] captures a launch POST exactly as the HTTP adapter
//! received it: the method, the request URL, and every form and query
//! parameter in arrival order. The domain never normalises parameter values;
//! signature verification depends on seeing the request byte-for-byte.

use std::collections::BTreeMap;
use std::fmt;

/// Parameter naming the LTI message type.
pub const LTI_MESSAGE_TYPE: &str = "lti_message_type";

/// The only message type a launch may carry.
pub const LAUNCH_MESSAGE_TYPE: &str = "basic-lti-launch-request";

/// Parameter naming the LTI protocol version.
pub const LTI_VERSION: &str = "lti_version";

/// The only protocol version a launch may carry.
pub const SUPPORTED_LTI_VERSION: &str = "LTI-1p0";

/// Parameter naming the launched resource; also the default resource-id
/// attribute.
pub const RESOURCE_LINK_ID: &str = "resource_link_id";

/// Parameter carrying the consumer key.
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";

/// Parameter carrying the base64 HMAC-SHA1 signature.
pub const OAUTH_SIGNATURE: &str = "oauth_signature";

/// Parameter naming the signature method; only HMAC-SHA1 is accepted.
pub const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";

/// Namespace prefix of OAuth protocol parameters.
pub const OAUTH_PREFIX: &str = "oauth_";

/// Identifier of the survey a launch targets.
///
/// # Examples
/// ```
/// use lti_gateway::domain::SurveyId;
///
/// let survey = SurveyId::new(42);
/// assert_eq!(survey.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurveyId(u32);

impl SurveyId {
    /// Wrap a raw survey identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw numeric identifier.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for SurveyId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for SurveyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP method of a launch request, as used in the signature base string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET launches occur when a consumer signs query parameters only.
    Get,
    /// Standard form-encoded launch.
    Post,
}

impl HttpMethod {
    /// Uppercase method name for the signature base string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A launch request exactly as received, immutable once constructed.
///
/// Parameters keep their arrival order and may contain duplicate keys; form
/// semantics (the last occurrence wins) apply only when a single value is
/// looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    method: HttpMethod,
    url: String,
    params: Vec<(String, String)>,
}

impl LaunchRequest {
    /// Bundle a received request for verification.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self {
            method,
            url: url.into(),
            params,
        }
    }

    /// Request method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// URL the consumer signed against.
    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Every parameter in arrival order, duplicates included.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        self.params.as_slice()
    }

    /// Look up a single parameter value, last occurrence winning.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The attribute bag handed downstream after verification: every
    /// parameter outside the OAuth namespace plus the retained consumer key.
    #[must_use]
    pub fn attribute_bag(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .filter(|(key, _)| !key.starts_with(OAUTH_PREFIX) || key == OAUTH_CONSUMER_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// A launch whose signature has been verified.
///
/// Holds the consumer key the signature was valid for and the attribute bag
/// passed to the attribute mapper. The caller must still confirm the key
/// matches the one the targeted survey expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedLaunch {
    consumer_key: String,
    attributes: BTreeMap<String, String>,
}

impl VerifiedLaunch {
    pub(crate) fn new(consumer_key: String, attributes: BTreeMap<String, String>) -> Self {
        Self {
            consumer_key,
            attributes,
        }
    }

    /// Consumer key the signature verified under.
    #[must_use]
    pub fn consumer_key(&self) -> &str {
        self.consumer_key.as_str()
    }

    /// Non-OAuth request parameters, consumer key included.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}
