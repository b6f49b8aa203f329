//! Port resolving launch policies for targeted surveys.

use async_trait::async_trait;

use crate::domain::launch::SurveyId;
use crate::domain::policy::LaunchPolicy;

use super::macros::define_port_error;

define_port_error! {
    /// Errors raised by policy store adapters.
    pub enum PolicyStoreError {
        /// The backing settings source failed.
        Backend { message: String } =>
            "launch policy store failed: {message}",
    }
}

/// Port resolving the launch policy configured for a survey.
///
/// `None` means the survey is not configured for launching; the HTTP layer
/// reports it as not found, exactly like a survey that does not exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Resolve the policy for one survey.
    async fn policy_for(
        &self,
        survey_id: SurveyId,
    ) -> Result<Option<LaunchPolicy>, PolicyStoreError>;
}

/// Fixture implementation for tests without configured surveys.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePolicyStore;

#[async_trait]
impl PolicyStore for FixturePolicyStore {
    async fn policy_for(
        &self,
        _survey_id: SurveyId,
    ) -> Result<Option<LaunchPolicy>, PolicyStoreError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn fixture_knows_no_surveys() {
        let store = FixturePolicyStore;
        let policy = store
            .policy_for(SurveyId::new(1))
            .await
            .expect("fixture lookup succeeds");
        assert!(policy.is_none());
    }
}
