//! OAuth 1.0a HMAC-SHA1 verification of launch requests.
//!
//! Verification recomputes the signature base string per RFC 5849 §3.4
//! (uppercase method, normalised URL, and the sorted percent-encoded
//! parameter string), keys it with the consumer secret, and compares the
//! base64 digest against the presented `oauth_signature` in constant time.
//!
//! Precondition failures are reported individually so a misconfigured
//! platform can be diagnosed; every cryptographic failure collapses into
//! one generic [`SignatureError::VerificationFailed`] so nothing about the
//! mismatch leaks to the caller.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;
use url::Url;

use crate::domain::launch::{
    LAUNCH_MESSAGE_TYPE, LTI_MESSAGE_TYPE, LTI_VERSION, LaunchRequest, OAUTH_CONSUMER_KEY,
    OAUTH_SIGNATURE, OAUTH_SIGNATURE_METHOD, RESOURCE_LINK_ID, SUPPORTED_LTI_VERSION,
    VerifiedLaunch,
};
use crate::domain::policy::Consumer;

type HmacSha1 = Hmac<Sha1>;

/// The signature method launches must declare.
const HMAC_SHA1_METHOD: &str = "HMAC-SHA1";

/// RFC 3986 unreserved characters pass through; everything else is
/// percent-encoded with uppercase hex digits, as RFC 5849 §3.6 requires.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Failures raised while verifying a launch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// `lti_message_type` is absent or not a basic launch request.
    #[error("request is not a basic LTI launch request")]
    NotALaunchRequest,
    /// `lti_version` is absent or unsupported.
    #[error("request carries an unsupported LTI version")]
    UnsupportedVersion,
    /// `resource_link_id` is absent.
    #[error("request is missing a resource link id")]
    MissingResourceLink,
    /// `oauth_consumer_key` is absent or empty.
    #[error("request is missing a consumer key")]
    MissingConsumerKey,
    /// The request URL could not be parsed for normalisation.
    #[error("request URL is not a valid absolute URL")]
    InvalidUrl,
    /// The signature is absent, uses an unsupported method, or does not
    /// match. Deliberately silent about which.
    #[error("launch signature verification failed")]
    VerificationFailed,
}

/// Verify a launch request against a consumer's shared secret.
///
/// Precondition gates run in a fixed order before any cryptographic work:
/// message type, protocol version, resource link presence, consumer key
/// presence. On success the returned [`VerifiedLaunch`] carries the
/// attribute bag for downstream mapping; the caller must still compare the
/// verified consumer key against the key the targeted survey expects.
///
/// # Errors
///
/// Returns a distinct [`SignatureError`] per failed precondition and the
/// generic [`SignatureError::VerificationFailed`] for every signature
/// problem.
///
/// # Examples
/// ```
/// use lti_gateway::domain::signature::{sign, verify};
/// use lti_gateway::domain::{Consumer, HttpMethod, LaunchRequest};
///
/// let consumer = Consumer::try_from_parts("K1", "S1").unwrap();
/// let mut params = vec![
///     ("lti_message_type".to_owned(), "basic-lti-launch-request".to_owned()),
///     ("lti_version".to_owned(), "LTI-1p0".to_owned()),
///     ("resource_link_id".to_owned(), "unit42".to_owned()),
///     ("oauth_consumer_key".to_owned(), "K1".to_owned()),
///     ("oauth_signature_method".to_owned(), "HMAC-SHA1".to_owned()),
/// ];
/// let unsigned = LaunchRequest::new(
///     HttpMethod::Post,
///     "https://surveys.example.org/lti/launch/1",
///     params.clone(),
/// );
/// params.push(("oauth_signature".to_owned(), sign(&unsigned, &consumer).unwrap()));
/// let signed = LaunchRequest::new(
///     HttpMethod::Post,
///     "https://surveys.example.org/lti/launch/1",
///     params,
/// );
///
/// let verified = verify(&signed, &consumer).unwrap();
/// assert_eq!(verified.consumer_key(), "K1");
/// ```
pub fn verify(
    request: &LaunchRequest,
    consumer: &Consumer,
) -> Result<VerifiedLaunch, SignatureError> {
    if request.param(LTI_MESSAGE_TYPE) != Some(LAUNCH_MESSAGE_TYPE) {
        return Err(SignatureError::NotALaunchRequest);
    }
    if request.param(LTI_VERSION) != Some(SUPPORTED_LTI_VERSION) {
        return Err(SignatureError::UnsupportedVersion);
    }
    if request.param(RESOURCE_LINK_ID).is_none() {
        return Err(SignatureError::MissingResourceLink);
    }
    let consumer_key = request
        .param(OAUTH_CONSUMER_KEY)
        .filter(|key| !key.is_empty())
        .ok_or(SignatureError::MissingConsumerKey)?;

    if request.param(OAUTH_SIGNATURE_METHOD) != Some(HMAC_SHA1_METHOD) {
        return Err(SignatureError::VerificationFailed);
    }
    let presented = request
        .param(OAUTH_SIGNATURE)
        .ok_or(SignatureError::VerificationFailed)?;

    let expected = sign(request, consumer)?;
    if bool::from(expected.as_bytes().ct_eq(presented.as_bytes())) {
        Ok(VerifiedLaunch::new(
            consumer_key.to_owned(),
            request.attribute_bag(),
        ))
    } else {
        Err(SignatureError::VerificationFailed)
    }
}

/// Compute the base64 HMAC-SHA1 signature a consumer would attach.
///
/// Any `oauth_signature` already present in the request is excluded from
/// the base string, so signing and verification see the same input. Public
/// because consumer simulations (and this crate's own tests) need to
/// produce correctly signed launches.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidUrl`] when the request URL cannot be
/// normalised.
pub fn sign(request: &LaunchRequest, consumer: &Consumer) -> Result<String, SignatureError> {
    let base = signature_base_string(request)?;
    // RFC 5849 §3.4.2: key is encode(secret) & encode(token secret); a
    // launch flow has no token secret.
    let key = format!("{}&", encode(consumer.secret()));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|_| SignatureError::VerificationFailed)?;
    mac.update(base.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn signature_base_string(request: &LaunchRequest) -> Result<String, SignatureError> {
    let url = normalized_url(request.url())?;
    let params = normalized_parameters(request.params());
    Ok(format!(
        "{}&{}&{}",
        request.method().as_str(),
        encode(&url),
        encode(&params)
    ))
}

/// Normalise a URL per RFC 5849 §3.4.1.2: lowercase scheme and host,
/// default ports elided, query and fragment dropped.
fn normalized_url(raw: &str) -> Result<String, SignatureError> {
    let url = Url::parse(raw).map_err(|_| SignatureError::InvalidUrl)?;
    let host = url.host_str().ok_or(SignatureError::InvalidUrl)?;
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    Ok(format!(
        "{scheme}://{host}{port}{path}",
        scheme = url.scheme(),
        path = url.path()
    ))
}

/// Encode, sort, and join every parameter except the signature itself.
fn normalized_parameters(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .filter(|(key, _)| key != OAUTH_SIGNATURE)
        .map(|(key, value)| (encode(key), encode(value)))
        .collect();
    encoded.sort();
    encoded
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::launch::HttpMethod;
    use rstest::rstest;

    const LAUNCH_URL: &str = "https://surveys.example.org/lti/launch/1";

    fn consumer() -> Consumer {
        Consumer::try_from_parts("K1", "S1").expect("valid credentials")
    }

    fn base_params() -> Vec<(String, String)> {
        [
            ("lti_message_type", "basic-lti-launch-request"),
            ("lti_version", "LTI-1p0"),
            ("resource_link_id", "unit42"),
            ("user_id", "stu7"),
            ("oauth_consumer_key", "K1"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1700000000"),
            ("oauth_nonce", "nonce-1"),
            ("oauth_version", "1.0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
    }

    fn signed_request(mut params: Vec<(String, String)>, signer: &Consumer) -> LaunchRequest {
        let unsigned = LaunchRequest::new(HttpMethod::Post, LAUNCH_URL, params.clone());
        let signature = sign(&unsigned, signer).expect("signable request");
        params.push(("oauth_signature".to_owned(), signature));
        LaunchRequest::new(HttpMethod::Post, LAUNCH_URL, params)
    }

    #[rstest]
    fn correctly_signed_request_verifies_and_keeps_attributes() {
        let request = signed_request(base_params(), &consumer());
        let verified = verify(&request, &consumer()).expect("signature valid");

        assert_eq!(verified.consumer_key(), "K1");
        let attributes = verified.attributes();
        assert_eq!(attributes.get("user_id").map(String::as_str), Some("stu7"));
        assert_eq!(
            attributes.get("oauth_consumer_key").map(String::as_str),
            Some("K1")
        );
        assert!(!attributes.contains_key("oauth_signature"));
        assert!(!attributes.contains_key("oauth_nonce"));
        assert!(!attributes.contains_key("oauth_timestamp"));
    }

    #[rstest]
    fn tampered_parameter_fails_verification() {
        let request = signed_request(base_params(), &consumer());
        let tampered: Vec<(String, String)> = request
            .params()
            .iter()
            .map(|(key, value)| {
                if key == "user_id" {
                    (key.clone(), "someone-else".to_owned())
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect();
        let tampered = LaunchRequest::new(HttpMethod::Post, LAUNCH_URL, tampered);

        let err = verify(&tampered, &consumer()).expect_err("tampering must fail");
        assert_eq!(err, SignatureError::VerificationFailed);
    }

    #[rstest]
    fn wrong_secret_fails_verification() {
        let other = Consumer::try_from_parts("K1", "S2").expect("valid credentials");
        let request = signed_request(base_params(), &other);

        let err = verify(&request, &consumer()).expect_err("wrong secret must fail");
        assert_eq!(err, SignatureError::VerificationFailed);
    }

    #[rstest]
    fn missing_signature_fails_generically() {
        let request = LaunchRequest::new(HttpMethod::Post, LAUNCH_URL, base_params());
        let err = verify(&request, &consumer()).expect_err("no signature");
        assert_eq!(err, SignatureError::VerificationFailed);
    }

    #[rstest]
    fn unsupported_signature_method_fails_generically() {
        let params: Vec<(String, String)> = base_params()
            .into_iter()
            .map(|(key, value)| {
                if key == "oauth_signature_method" {
                    (key, "PLAINTEXT".to_owned())
                } else {
                    (key, value)
                }
            })
            .collect();
        let request = signed_request(params, &consumer());

        let err = verify(&request, &consumer()).expect_err("plaintext refused");
        assert_eq!(err, SignatureError::VerificationFailed);
    }

    #[rstest]
    #[case("lti_message_type", SignatureError::NotALaunchRequest)]
    #[case("lti_version", SignatureError::UnsupportedVersion)]
    #[case("resource_link_id", SignatureError::MissingResourceLink)]
    #[case("oauth_consumer_key", SignatureError::MissingConsumerKey)]
    fn missing_preconditions_fail_before_crypto(
        #[case] dropped: &str,
        #[case] expected: SignatureError,
    ) {
        let params: Vec<(String, String)> = base_params()
            .into_iter()
            .filter(|(key, _)| key != dropped)
            .collect();
        // No signature at all: precondition gates must fire first.
        let request = LaunchRequest::new(HttpMethod::Post, LAUNCH_URL, params);

        let err = verify(&request, &consumer()).expect_err("precondition must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn empty_consumer_key_is_a_missing_key() {
        let params: Vec<(String, String)> = base_params()
            .into_iter()
            .map(|(key, value)| {
                if key == "oauth_consumer_key" {
                    (key, String::new())
                } else {
                    (key, value)
                }
            })
            .collect();
        let request = LaunchRequest::new(HttpMethod::Post, LAUNCH_URL, params);

        let err = verify(&request, &consumer()).expect_err("empty key must fail");
        assert_eq!(err, SignatureError::MissingConsumerKey);
    }

    #[rstest]
    fn base_string_normalises_url_and_sorts_encoded_parameters() {
        let request = LaunchRequest::new(
            HttpMethod::Post,
            "HTTP://Example.COM:80/Launch Path",
            vec![
                ("b".to_owned(), "2 2".to_owned()),
                ("a".to_owned(), "1".to_owned()),
                ("oauth_signature".to_owned(), "excluded".to_owned()),
            ],
        );

        let base = signature_base_string(&request).expect("valid URL");
        assert_eq!(
            base,
            "POST&http%3A%2F%2Fexample.com%2FLaunch%2520Path&a%3D1%26b%3D2%25202"
        );
    }

    #[rstest]
    fn non_default_port_is_kept_in_the_base_string() {
        let normalized = normalized_url("https://surveys.example.org:8443/lti?x=1#frag")
            .expect("valid URL");
        assert_eq!(normalized, "https://surveys.example.org:8443/lti");
    }

    #[rstest]
    #[case("hello world", "hello%20world")]
    #[case("a+b", "a%2Bb")]
    #[case("keep-._~", "keep-._~")]
    #[case("ü", "%C3%BC")]
    fn oauth_percent_encoding_matches_rfc5849(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(encode(raw), expected);
    }
}
