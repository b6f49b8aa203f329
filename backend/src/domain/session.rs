//! Participant session entity and its completion lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::domain::attributes::CanonicalIdentity;

/// Opaque access token tying a browser to a participant session.
///
/// Tokens are minted by a [`TokenGenerator`](crate::domain::TokenGenerator)
/// and never derived from launch data; guessing one must be as hard as the
/// generator's entropy contract promises.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap an already-minted token value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Consume the wrapper, returning the raw token value.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion state of a participant session.
///
/// Only [`CompletionStatus::Completed`] blocks a resume; any other state
/// means the participant may pick the survey back up. Further states may be
/// added by stores that track survey-engine progress in more detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompletionStatus {
    /// Session was provisioned but the survey was never opened.
    NotStarted,
    /// Participant has answered at least one page.
    InProgress,
    /// Survey was submitted; the session cannot be resumed.
    Completed,
}

impl CompletionStatus {
    /// Whether this state blocks resuming the session.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Draft of a session about to be persisted.
///
/// Carries everything the store needs except what the store itself owns:
/// the completion state (new sessions always start out not-started) and the
/// creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipantSession {
    /// Freshly minted access token.
    pub token: SessionToken,
    /// Resource identifier from the canonical identity.
    pub resource_id: String,
    /// User identifier from the canonical identity.
    pub user_id: String,
    /// Return URL, empty when unmapped.
    pub return_url: String,
    /// Course title, empty when unmapped.
    pub course_title: String,
    /// First name, empty when unmapped.
    pub first_name: String,
    /// Last name, empty when unmapped.
    pub last_name: String,
    /// Email address, empty when unmapped.
    pub email: String,
}

impl NewParticipantSession {
    /// Build a draft from a mapped identity and a fresh token.
    #[must_use]
    pub fn from_identity(token: SessionToken, identity: &CanonicalIdentity) -> Self {
        Self {
            token,
            resource_id: identity.resource_id.clone(),
            user_id: identity.user_id.clone(),
            return_url: identity.return_url.clone(),
            course_title: identity.course_title.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            email: identity.email.clone(),
        }
    }
}

/// A persisted participant session.
///
/// ## Invariants
/// - `token` is unique within the survey's participant table.
/// - With multiple completions disabled, at most one session exists per
///   `(resource_id, user_id)` pair within a survey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSession {
    token: SessionToken,
    resource_id: String,
    user_id: String,
    return_url: String,
    course_title: String,
    first_name: String,
    last_name: String,
    email: String,
    completed: CompletionStatus,
    created_at: DateTime<Utc>,
}

impl ParticipantSession {
    /// Materialise a session record; called by store adapters.
    #[must_use]
    pub fn from_draft(
        draft: NewParticipantSession,
        completed: CompletionStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: draft.token,
            resource_id: draft.resource_id,
            user_id: draft.user_id,
            return_url: draft.return_url,
            course_title: draft.course_title,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            completed,
            created_at,
        }
    }

    /// Access token of this session.
    #[must_use]
    pub const fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Resource identifier keying the session.
    #[must_use]
    pub fn resource_id(&self) -> &str {
        self.resource_id.as_str()
    }

    /// User identifier keying the session.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Return URL captured at creation, possibly empty.
    #[must_use]
    pub fn return_url(&self) -> &str {
        self.return_url.as_str()
    }

    /// Course title captured at creation, possibly empty.
    #[must_use]
    pub fn course_title(&self) -> &str {
        self.course_title.as_str()
    }

    /// First name captured at creation, possibly empty.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.first_name.as_str()
    }

    /// Last name captured at creation, possibly empty.
    #[must_use]
    pub fn last_name(&self) -> &str {
        self.last_name.as_str()
    }

    /// Email captured at creation, possibly empty.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Completion state.
    #[must_use]
    pub const fn completed(&self) -> CompletionStatus {
        self.completed
    }

    /// When the session record was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Copy of this session with the completion state replaced.
    ///
    /// Store adapters use this when the surrounding survey engine reports
    /// progress; the core itself never rewrites an existing session.
    #[must_use]
    pub fn with_completed(mut self, completed: CompletionStatus) -> Self {
        self.completed = completed;
        self
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn identity() -> CanonicalIdentity {
        CanonicalIdentity {
            resource_id: "unit42".to_owned(),
            user_id: "stu7".to_owned(),
            return_url: String::new(),
            course_title: "Research Methods".to_owned(),
            email: "ada@example.org".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
        }
    }

    #[rstest]
    fn draft_copies_identity_fields() {
        let draft = NewParticipantSession::from_identity(SessionToken::new("tok"), &identity());
        assert_eq!(draft.resource_id, "unit42");
        assert_eq!(draft.user_id, "stu7");
        assert_eq!(draft.return_url, "");
        assert_eq!(draft.email, "ada@example.org");
    }

    #[rstest]
    #[case(CompletionStatus::NotStarted, false)]
    #[case(CompletionStatus::InProgress, false)]
    #[case(CompletionStatus::Completed, true)]
    fn only_completed_blocks_resume(#[case] status: CompletionStatus, #[case] blocked: bool) {
        assert_eq!(status.is_completed(), blocked);
    }

    #[rstest]
    fn with_completed_replaces_only_the_status() {
        let draft = NewParticipantSession::from_identity(SessionToken::new("tok"), &identity());
        let created_at = Utc::now();
        let session =
            ParticipantSession::from_draft(draft, CompletionStatus::NotStarted, created_at);

        let completed = session.clone().with_completed(CompletionStatus::Completed);
        assert!(completed.completed().is_completed());
        assert_eq!(completed.token(), session.token());
        assert_eq!(completed.created_at(), created_at);
    }
}
