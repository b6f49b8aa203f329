//! Shared validation helpers for inbound HTTP adapters.

use serde_json::json;

use crate::domain::{Error, SurveyId};

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

/// Parse a survey identifier from a path segment.
pub(crate) fn parse_survey_id(value: &str, field: FieldName) -> Result<SurveyId, Error> {
    value.parse::<u32>().map(SurveyId::new).map_err(|_| {
        Error::invalid_request(format!("{} must be a numeric survey id", field.as_str()))
            .with_details(json!({
                "field": field.as_str(),
                "value": value,
                "code": "invalid_survey_id",
            }))
    })
}
