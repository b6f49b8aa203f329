//! Driving port for handling a launch end to end.

use async_trait::async_trait;

use crate::domain::error::Error;
use crate::domain::launch::{LaunchRequest, SurveyId};
use crate::domain::policy::LaunchPolicy;
use crate::domain::session::SessionToken;

/// Input to one launch attempt.
///
/// The policy travels with the request so the orchestrator holds no
/// per-survey state of its own; whoever answers the HTTP request resolves
/// the policy and passes it along.
#[derive(Debug, Clone)]
pub struct HandleLaunchRequest {
    /// Survey the launch targets.
    pub survey_id: SurveyId,
    /// The request as received.
    pub launch: LaunchRequest,
    /// Policy configured for the survey.
    pub policy: LaunchPolicy,
}

/// Outcome of a successful launch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleLaunchResponse {
    /// Where to send the participant's browser.
    pub redirect: RedirectTarget,
}

/// Transport-agnostic redirect destination.
///
/// The HTTP adapter renders this into an absolute survey URL; `fresh`
/// becomes the start-new marker distinguishing a first visit from a
/// mid-survey resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// Survey hosting the session.
    pub survey_id: SurveyId,
    /// Token identifying the session.
    pub token: SessionToken,
    /// Whether the session was created by this launch.
    pub fresh: bool,
}

/// Port handling verified-or-rejected launch attempts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LaunchCommand: Send + Sync {
    /// Validate, authenticate, and resolve one launch attempt.
    async fn handle_launch(
        &self,
        request: HandleLaunchRequest,
    ) -> Result<HandleLaunchResponse, Error>;
}
