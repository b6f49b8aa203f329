//! Launch orchestration service.
//!
//! [`LaunchService`] drives a launch through its gates: the survey must be
//! activated, the signature must verify, the verified consumer key must be
//! the one the survey expects, and the mapped identity either resumes the
//! existing session or provisions a fresh one. Every rejection terminates
//! only the launch at hand.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::attributes::CanonicalIdentity;
use crate::domain::error::Error;
use crate::domain::launch::SurveyId;
use crate::domain::policy::LaunchPolicy;
use crate::domain::ports::{
    HandleLaunchRequest, HandleLaunchResponse, LaunchCommand, ParticipantStore,
    ParticipantStoreError, RedirectTarget, SessionUniqueness,
};
use crate::domain::session::{NewParticipantSession, ParticipantSession};
use crate::domain::signature::{self, SignatureError};
use crate::domain::token::TokenGenerator;

fn map_store_error(error: ParticipantStoreError) -> Error {
    match error {
        ParticipantStoreError::Connection { message } => {
            Error::service_unavailable(format!("participant store unavailable: {message}"))
        }
        ParticipantStoreError::Query { message } => {
            Error::internal(format!("participant store error: {message}"))
        }
        ParticipantStoreError::MissingTable { survey_id } => {
            Error::not_found(format!("survey {survey_id} has no participant table"))
        }
        ParticipantStoreError::Conflict { .. } => {
            Error::internal("participant store reported a conflict outside a create")
        }
    }
}

fn map_signature_error(error: SignatureError) -> Error {
    match error {
        SignatureError::NotALaunchRequest
        | SignatureError::UnsupportedVersion
        | SignatureError::MissingResourceLink
        | SignatureError::MissingConsumerKey
        | SignatureError::InvalidUrl => Error::invalid_request(error.to_string()),
        SignatureError::VerificationFailed => Error::unauthorized(error.to_string()),
    }
}

enum Resolution {
    Created(ParticipantSession),
    Resumed(ParticipantSession),
}

/// Orchestrator implementing the [`LaunchCommand`] driving port.
#[derive(Clone)]
pub struct LaunchService<S> {
    participants: Arc<S>,
    tokens: Arc<dyn TokenGenerator>,
}

impl<S> LaunchService<S> {
    /// Create a service over a participant store and a token source.
    pub fn new(participants: Arc<S>, tokens: Arc<dyn TokenGenerator>) -> Self {
        Self {
            participants,
            tokens,
        }
    }
}

impl<S> LaunchService<S>
where
    S: ParticipantStore,
{
    async fn resolve_session(
        &self,
        survey_id: SurveyId,
        policy: &LaunchPolicy,
        identity: &CanonicalIdentity,
    ) -> Result<Resolution, Error> {
        if policy.allow_multiple_completions() {
            let session = self
                .create_session(survey_id, identity, SessionUniqueness::Unrestricted)
                .await
                .map_err(map_store_error)?;
            return Ok(Resolution::Created(session));
        }

        let existing = self
            .participants
            .find_by_resource_and_user(survey_id, &identity.resource_id, &identity.user_id)
            .await
            .map_err(map_store_error)?;

        match existing {
            Some(session) => resume(session),
            None => {
                match self
                    .create_session(survey_id, identity, SessionUniqueness::PerResourceUser)
                    .await
                {
                    Ok(session) => Ok(Resolution::Created(session)),
                    Err(ParticipantStoreError::Conflict { .. }) => {
                        // Lost a concurrent create race; the winner's session
                        // is authoritative.
                        let winner = self
                            .participants
                            .find_by_resource_and_user(
                                survey_id,
                                &identity.resource_id,
                                &identity.user_id,
                            )
                            .await
                            .map_err(map_store_error)?
                            .ok_or_else(|| {
                                Error::internal(
                                    "participant store reported a conflict but holds no session",
                                )
                            })?;
                        resume(winner)
                    }
                    Err(other) => Err(map_store_error(other)),
                }
            }
        }
    }

    async fn create_session(
        &self,
        survey_id: SurveyId,
        identity: &CanonicalIdentity,
        uniqueness: SessionUniqueness,
    ) -> Result<ParticipantSession, ParticipantStoreError> {
        let token = self.tokens.generate();
        let draft = NewParticipantSession::from_identity(token, identity);
        self.participants.create(survey_id, draft, uniqueness).await
    }
}

fn resume(session: ParticipantSession) -> Result<Resolution, Error> {
    if session.completed().is_completed() {
        Err(Error::conflict("survey already completed"))
    } else {
        Ok(Resolution::Resumed(session))
    }
}

#[async_trait]
impl<S> LaunchCommand for LaunchService<S>
where
    S: ParticipantStore,
{
    async fn handle_launch(
        &self,
        request: HandleLaunchRequest,
    ) -> Result<HandleLaunchResponse, Error> {
        let HandleLaunchRequest {
            survey_id,
            launch,
            policy,
        } = request;

        if !self
            .participants
            .table_exists(survey_id)
            .await
            .map_err(map_store_error)?
        {
            return Err(Error::not_found(format!(
                "survey {survey_id} has no participant table"
            )));
        }

        let verified =
            signature::verify(&launch, policy.consumer()).map_err(map_signature_error)?;

        // A valid signature under the wrong key/secret association must
        // still fail; this gate is independent of the cryptographic check.
        if verified.consumer_key() != policy.consumer().key() {
            return Err(Error::unauthorized(
                "launch key does not match the survey's consumer",
            ));
        }

        debug!(
            survey = %survey_id,
            consumer_key = verified.consumer_key(),
            attribute_count = verified.attributes().len(),
            "launch signature verified"
        );

        let identity = policy
            .mapping()
            .resolve(verified.attributes())
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        debug!(
            survey = %survey_id,
            resource = identity.resource_id.as_str(),
            user = identity.user_id.as_str(),
            "launch identity mapped"
        );

        let (session, fresh) = match self.resolve_session(survey_id, &policy, &identity).await? {
            Resolution::Created(session) => (session, true),
            Resolution::Resumed(session) => (session, false),
        };

        info!(
            survey = %survey_id,
            resource = session.resource_id(),
            fresh,
            "participant session resolved"
        );

        Ok(HandleLaunchResponse {
            redirect: RedirectTarget {
                survey_id,
                token: session.token().clone(),
                fresh,
            },
        })
    }
}

#[cfg(test)]
#[path = "launch_service_tests.rs"]
mod tests;
