//! Mapping of platform-defined launch attributes onto a canonical identity.
//!
//! Platforms disagree on attribute names: openEdX sends `resource_link_id`
//! and `user_id`, Canvas deployments often use `custom_canvas_course_id` and
//! `custom_canvas_user_id`. An [`AttributeMapping`] binds each canonical
//! field to its source key; [`AttributeMapping::resolve`] is a pure lookup
//! with no trimming, case folding, or other value normalisation.

use std::collections::BTreeMap;

use thiserror::Error;

/// Default source key for the resource identifier.
pub const DEFAULT_RESOURCE_ID_KEY: &str = "resource_link_id";
/// Default source key for the user identifier.
pub const DEFAULT_USER_ID_KEY: &str = "user_id";
/// Default source key for the return URL.
pub const DEFAULT_RETURN_URL_KEY: &str = "launch_presentation_return_url";
/// Default source key for the course title.
pub const DEFAULT_COURSE_TITLE_KEY: &str = "context_title";
/// Default source key for the participant email address.
pub const DEFAULT_EMAIL_KEY: &str = "lis_person_contact_email_primary";
/// Default source key for the participant first name.
pub const DEFAULT_FIRST_NAME_KEY: &str = "lis_person_name_given";
/// Default source key for the participant last name.
pub const DEFAULT_LAST_NAME_KEY: &str = "lis_person_name_family";

/// Failures raised while resolving mandatory identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// The resource-id source key is absent from the attribute bag.
    #[error("launch is missing the resource id attribute {key}")]
    MissingResourceId {
        /// Configured source key that was not found.
        key: String,
    },
    /// The user-id source key is absent from the attribute bag.
    #[error("launch is missing the user id attribute {key}")]
    MissingUserId {
        /// Configured source key that was not found.
        key: String,
    },
}

/// Configuration binding canonical identity fields to request attribute keys.
///
/// The resource-id and user-id bindings are mandatory; the remaining fields
/// may be unbound, meaning "do not populate".
///
/// # Examples
/// ```
/// use lti_gateway::domain::AttributeMapping;
///
/// let mapping = AttributeMapping::default()
///     .with_resource_id("custom_canvas_course_id")
///     .with_email(None);
/// assert_eq!(mapping.resource_id(), "custom_canvas_course_id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMapping {
    resource_id: String,
    user_id: String,
    return_url: Option<String>,
    course_title: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl Default for AttributeMapping {
    fn default() -> Self {
        Self {
            resource_id: DEFAULT_RESOURCE_ID_KEY.to_owned(),
            user_id: DEFAULT_USER_ID_KEY.to_owned(),
            return_url: Some(DEFAULT_RETURN_URL_KEY.to_owned()),
            course_title: Some(DEFAULT_COURSE_TITLE_KEY.to_owned()),
            email: Some(DEFAULT_EMAIL_KEY.to_owned()),
            first_name: Some(DEFAULT_FIRST_NAME_KEY.to_owned()),
            last_name: Some(DEFAULT_LAST_NAME_KEY.to_owned()),
        }
    }
}

impl AttributeMapping {
    /// Rebind the resource-id source key.
    #[must_use]
    pub fn with_resource_id(mut self, key: impl Into<String>) -> Self {
        self.resource_id = key.into();
        self
    }

    /// Rebind the user-id source key.
    #[must_use]
    pub fn with_user_id(mut self, key: impl Into<String>) -> Self {
        self.user_id = key.into();
        self
    }

    /// Rebind or unbind the return-url source key.
    #[must_use]
    pub fn with_return_url(mut self, key: Option<String>) -> Self {
        self.return_url = key;
        self
    }

    /// Rebind or unbind the course-title source key.
    #[must_use]
    pub fn with_course_title(mut self, key: Option<String>) -> Self {
        self.course_title = key;
        self
    }

    /// Rebind or unbind the email source key.
    #[must_use]
    pub fn with_email(mut self, key: Option<String>) -> Self {
        self.email = key;
        self
    }

    /// Rebind or unbind the first-name source key.
    #[must_use]
    pub fn with_first_name(mut self, key: Option<String>) -> Self {
        self.first_name = key;
        self
    }

    /// Rebind or unbind the last-name source key.
    #[must_use]
    pub fn with_last_name(mut self, key: Option<String>) -> Self {
        self.last_name = key;
        self
    }

    /// Source key bound to the resource id.
    #[must_use]
    pub fn resource_id(&self) -> &str {
        self.resource_id.as_str()
    }

    /// Source key bound to the user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Resolve the canonical identity from a verified attribute bag.
    ///
    /// Mandatory fields fail when their source key is absent; optional
    /// fields resolve to an empty string when unbound or absent. Values pass
    /// through byte-for-byte.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] when the resource-id or user-id source key
    /// is missing from `attributes`.
    pub fn resolve(
        &self,
        attributes: &BTreeMap<String, String>,
    ) -> Result<CanonicalIdentity, MappingError> {
        let resource_id =
            attributes
                .get(&self.resource_id)
                .cloned()
                .ok_or_else(|| MappingError::MissingResourceId {
                    key: self.resource_id.clone(),
                })?;
        let user_id =
            attributes
                .get(&self.user_id)
                .cloned()
                .ok_or_else(|| MappingError::MissingUserId {
                    key: self.user_id.clone(),
                })?;

        Ok(CanonicalIdentity {
            resource_id,
            user_id,
            return_url: optional(attributes, self.return_url.as_deref()),
            course_title: optional(attributes, self.course_title.as_deref()),
            email: optional(attributes, self.email.as_deref()),
            first_name: optional(attributes, self.first_name.as_deref()),
            last_name: optional(attributes, self.last_name.as_deref()),
        })
    }
}

fn optional(attributes: &BTreeMap<String, String>, key: Option<&str>) -> String {
    key.and_then(|key| attributes.get(key))
        .cloned()
        .unwrap_or_default()
}

/// Canonical identity extracted from one verified launch.
///
/// Optional fields are empty strings when their source was unbound or
/// absent from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalIdentity {
    /// Identifier of the resource hosting the launch (e.g. the course unit).
    pub resource_id: String,
    /// Stable platform identifier of the launching user.
    pub user_id: String,
    /// URL the participant returns to after finishing.
    pub return_url: String,
    /// Human-readable course title.
    pub course_title: String,
    /// Participant email address.
    pub email: String,
    /// Participant first name.
    pub first_name: String,
    /// Participant last name.
    pub last_name: String,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn bag(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[rstest]
    fn resolves_defaults_and_passes_values_through_unaltered() {
        let attributes = bag(&[
            ("resource_link_id", "unit42"),
            ("user_id", "stu7"),
            ("context_title", "  Research Methods  "),
            ("lis_person_name_given", "Ada"),
        ]);

        let identity = AttributeMapping::default()
            .resolve(&attributes)
            .expect("mandatory fields present");

        assert_eq!(identity.resource_id, "unit42");
        assert_eq!(identity.user_id, "stu7");
        // Whitespace is platform data, not ours to trim.
        assert_eq!(identity.course_title, "  Research Methods  ");
        assert_eq!(identity.first_name, "Ada");
        assert_eq!(identity.last_name, "");
        assert_eq!(identity.email, "");
        assert_eq!(identity.return_url, "");
    }

    #[rstest]
    fn unbound_optional_fields_stay_empty_even_when_present() {
        let attributes = bag(&[
            ("resource_link_id", "unit42"),
            ("user_id", "stu7"),
            ("lis_person_contact_email_primary", "ada@example.org"),
        ]);

        let identity = AttributeMapping::default()
            .with_email(None)
            .resolve(&attributes)
            .expect("mandatory fields present");

        assert_eq!(identity.email, "");
    }

    #[rstest]
    fn rebound_keys_read_from_the_configured_attribute() {
        let attributes = bag(&[
            ("custom_canvas_course_id", "course-9"),
            ("custom_canvas_user_id", "u-77"),
        ]);

        let identity = AttributeMapping::default()
            .with_resource_id("custom_canvas_course_id")
            .with_user_id("custom_canvas_user_id")
            .resolve(&attributes)
            .expect("mandatory fields present");

        assert_eq!(identity.resource_id, "course-9");
        assert_eq!(identity.user_id, "u-77");
    }

    #[rstest]
    fn missing_resource_id_names_the_configured_key() {
        let attributes = bag(&[("user_id", "stu7")]);
        let err = AttributeMapping::default()
            .resolve(&attributes)
            .expect_err("resource id absent");
        assert_eq!(
            err,
            MappingError::MissingResourceId {
                key: "resource_link_id".to_owned()
            }
        );
    }

    #[rstest]
    fn missing_user_id_names_the_configured_key() {
        let attributes = bag(&[("resource_link_id", "unit42")]);
        let err = AttributeMapping::default()
            .resolve(&attributes)
            .expect_err("user id absent");
        assert_eq!(
            err,
            MappingError::MissingUserId {
                key: "user_id".to_owned()
            }
        );
    }
}
