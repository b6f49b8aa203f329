//! Port for participant session persistence.
//!
//! The survey platform owns the participant tables; this port is the narrow
//! contract the launch core consumes. Its one non-obvious requirement is
//! atomicity: under [`SessionUniqueness::PerResourceUser`], `create` must
//! enforce the per-(resource, user) uniqueness constraint atomically with
//! respect to concurrent callers and surface a violation as
//! [`ParticipantStoreError::Conflict`], which the orchestrator treats as
//! "lost the race, fall back to resume" rather than as a failure.

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::launch::SurveyId;
use crate::domain::session::{CompletionStatus, NewParticipantSession, ParticipantSession};

use super::macros::define_port_error;

define_port_error! {
    /// Errors raised by participant store adapters.
    pub enum ParticipantStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "participant store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "participant store query failed: {message}",
        /// The survey has no participant table (not activated).
        MissingTable { survey_id: SurveyId } =>
            "participant table for survey {survey_id} does not exist",
        /// The per-(resource, user) uniqueness constraint rejected a create.
        Conflict { resource_id: String, user_id: String } =>
            "a session already exists for resource {resource_id} and user {user_id}",
    }
}

/// Uniqueness regime a `create` call runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUniqueness {
    /// Enforce at most one session per (resource, user) pair; violations
    /// surface as [`ParticipantStoreError::Conflict`].
    PerResourceUser,
    /// Permit any number of sessions per pair (multiple-completions mode).
    Unrestricted,
}

/// Port for looking up and creating participant sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Whether the survey's participant table exists.
    async fn table_exists(&self, survey_id: SurveyId) -> Result<bool, ParticipantStoreError>;

    /// Find the session keyed by a (resource, user) pair, if any.
    async fn find_by_resource_and_user(
        &self,
        survey_id: SurveyId,
        resource_id: &str,
        user_id: &str,
    ) -> Result<Option<ParticipantSession>, ParticipantStoreError>;

    /// Persist a new session under the given uniqueness regime.
    async fn create(
        &self,
        survey_id: SurveyId,
        session: NewParticipantSession,
        uniqueness: SessionUniqueness,
    ) -> Result<ParticipantSession, ParticipantStoreError>;
}

/// Fixture implementation for tests that do not exercise persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureParticipantStore;

#[async_trait]
impl ParticipantStore for FixtureParticipantStore {
    async fn table_exists(&self, _survey_id: SurveyId) -> Result<bool, ParticipantStoreError> {
        Ok(true)
    }

    async fn find_by_resource_and_user(
        &self,
        _survey_id: SurveyId,
        _resource_id: &str,
        _user_id: &str,
    ) -> Result<Option<ParticipantSession>, ParticipantStoreError> {
        Ok(None)
    }

    async fn create(
        &self,
        _survey_id: SurveyId,
        session: NewParticipantSession,
        _uniqueness: SessionUniqueness,
    ) -> Result<ParticipantSession, ParticipantStoreError> {
        Ok(ParticipantSession::from_draft(
            session,
            CompletionStatus::NotStarted,
            Utc::now(),
        ))
    }
}
