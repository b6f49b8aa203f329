//! JSON file-backed launch policy provider.
//!
//! One document configures every launchable survey: consumer credentials,
//! the multiple-completions flag, and attribute-name overrides. Binding an
//! optional attribute to an explicit empty string disables it ("do not
//! populate"); omitting it keeps the documented default.
//!
//! ```json
//! {
//!   "surveys": [
//!     {
//!       "survey_id": 42,
//!       "consumer": { "key": "K1", "secret": "S1" },
//!       "allow_multiple_completions": false,
//!       "attributes": { "resource_id": "custom_canvas_course_id", "email": "" }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::ports::{PolicyStore, PolicyStoreError};
use crate::domain::{
    AttributeMapping, Consumer, ConsumerValidationError, LaunchPolicy, SurveyId,
};

/// Failures raised while loading the policy document.
#[derive(Debug, Error)]
pub enum PolicyFileError {
    /// The file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The document is not valid JSON or has an unexpected shape.
    #[error("failed to parse policy document: {source}")]
    Parse {
        /// Underlying serde failure.
        source: serde_json::Error,
    },
    /// The same survey appears twice.
    #[error("survey {survey_id} is configured twice")]
    DuplicateSurvey {
        /// Offending survey identifier.
        survey_id: u32,
    },
    /// A survey's consumer credentials failed validation.
    #[error("survey {survey_id} has invalid consumer credentials: {source}")]
    InvalidConsumer {
        /// Offending survey identifier.
        survey_id: u32,
        /// Underlying validation failure.
        source: ConsumerValidationError,
    },
    /// A mandatory attribute was bound to an empty name.
    #[error("survey {survey_id} binds {field} to an empty attribute name")]
    BlankMandatoryAttribute {
        /// Offending survey identifier.
        survey_id: u32,
        /// Canonical field with the blank binding.
        field: &'static str,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyFileDto {
    surveys: Vec<SurveyEntryDto>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SurveyEntryDto {
    survey_id: u32,
    consumer: ConsumerDto,
    #[serde(default)]
    allow_multiple_completions: bool,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    attributes: AttributeMappingDto,
}

const fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConsumerDto {
    key: String,
    secret: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttributeMappingDto {
    resource_id: Option<String>,
    user_id: Option<String>,
    return_url: Option<String>,
    course_title: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl AttributeMappingDto {
    fn into_mapping(self, survey_id: u32) -> Result<AttributeMapping, PolicyFileError> {
        let mut mapping = AttributeMapping::default();
        if let Some(key) = self.resource_id {
            if key.is_empty() {
                return Err(PolicyFileError::BlankMandatoryAttribute {
                    survey_id,
                    field: "resource_id",
                });
            }
            mapping = mapping.with_resource_id(key);
        }
        if let Some(key) = self.user_id {
            if key.is_empty() {
                return Err(PolicyFileError::BlankMandatoryAttribute {
                    survey_id,
                    field: "user_id",
                });
            }
            mapping = mapping.with_user_id(key);
        }
        if let Some(binding) = optional_binding(self.return_url) {
            mapping = mapping.with_return_url(binding);
        }
        if let Some(binding) = optional_binding(self.course_title) {
            mapping = mapping.with_course_title(binding);
        }
        if let Some(binding) = optional_binding(self.email) {
            mapping = mapping.with_email(binding);
        }
        if let Some(binding) = optional_binding(self.first_name) {
            mapping = mapping.with_first_name(binding);
        }
        if let Some(binding) = optional_binding(self.last_name) {
            mapping = mapping.with_last_name(binding);
        }
        Ok(mapping)
    }
}

/// `None` keeps the default, `Some(None)` unbinds, `Some(Some(key))`
/// rebinds.
fn optional_binding(value: Option<String>) -> Option<Option<String>> {
    value.map(|key| if key.is_empty() { None } else { Some(key) })
}

#[derive(Debug)]
struct SurveyEntry {
    policy: LaunchPolicy,
    active: bool,
}

/// Launch policies loaded once at startup from a JSON document.
#[derive(Debug)]
pub struct JsonPolicyStore {
    surveys: BTreeMap<SurveyId, SurveyEntry>,
}

impl JsonPolicyStore {
    /// Load and validate a policy document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyFileError`] when the file is unreadable, malformed,
    /// or fails validation.
    pub fn from_path(path: &Path) -> Result<Self, PolicyFileError> {
        let data = std::fs::read_to_string(path).map_err(|source| PolicyFileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&data)
    }

    /// Parse and validate a policy document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyFileError`] when the document is malformed or fails
    /// validation.
    pub fn from_json(data: &str) -> Result<Self, PolicyFileError> {
        let file: PolicyFileDto =
            serde_json::from_str(data).map_err(|source| PolicyFileError::Parse { source })?;

        let mut surveys = BTreeMap::new();
        for entry in file.surveys {
            let survey_id = SurveyId::new(entry.survey_id);
            let consumer = Consumer::try_from_parts(&entry.consumer.key, &entry.consumer.secret)
                .map_err(|source| PolicyFileError::InvalidConsumer {
                    survey_id: entry.survey_id,
                    source,
                })?;
            let mapping = entry.attributes.into_mapping(entry.survey_id)?;
            let policy = LaunchPolicy::new(consumer, mapping, entry.allow_multiple_completions);

            if surveys
                .insert(
                    survey_id,
                    SurveyEntry {
                        policy,
                        active: entry.active,
                    },
                )
                .is_some()
            {
                return Err(PolicyFileError::DuplicateSurvey {
                    survey_id: entry.survey_id,
                });
            }
        }

        Ok(Self { surveys })
    }

    /// Surveys whose participant tables should exist.
    #[must_use]
    pub fn active_survey_ids(&self) -> Vec<SurveyId> {
        self.surveys
            .iter()
            .filter(|(_, entry)| entry.active)
            .map(|(survey_id, _)| *survey_id)
            .collect()
    }

    /// Number of configured surveys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surveys.len()
    }

    /// Whether any survey is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surveys.is_empty()
    }
}

#[async_trait]
impl PolicyStore for JsonPolicyStore {
    async fn policy_for(
        &self,
        survey_id: SurveyId,
    ) -> Result<Option<LaunchPolicy>, PolicyStoreError> {
        Ok(self
            .surveys
            .get(&survey_id)
            .map(|entry| entry.policy.clone()))
    }
}
