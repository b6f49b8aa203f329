//! Embedded in-memory participant store.
//!
//! Default adapter for deployments where the surrounding survey platform
//! has not supplied a database-backed store. One mutex guards all tables,
//! so the find-or-create race the launch flow cares about cannot interleave:
//! the uniqueness check and the insert happen under the same lock, which is
//! this adapter's implementation of the port's atomicity contract. A
//! database adapter would use a storage-level uniqueness constraint instead.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::ports::{ParticipantStore, ParticipantStoreError, SessionUniqueness};
use crate::domain::{
    CompletionStatus, NewParticipantSession, ParticipantSession, SessionToken, SurveyId,
};

type Tables = BTreeMap<SurveyId, Vec<ParticipantSession>>;

/// Mutex-guarded participant tables, one per activated survey.
#[derive(Debug, Default)]
pub struct MemoryParticipantStore {
    tables: Mutex<Tables>,
}

impl MemoryParticipantStore {
    /// Create an empty store with no activated surveys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the participant table for a survey.
    ///
    /// # Errors
    ///
    /// Returns [`ParticipantStoreError::Connection`] when the store lock is
    /// poisoned.
    pub fn activate(&self, survey_id: SurveyId) -> Result<(), ParticipantStoreError> {
        let mut tables = self.lock()?;
        tables.entry(survey_id).or_default();
        Ok(())
    }

    /// Mark a session completed.
    ///
    /// The launch core never completes sessions; this is the hook the
    /// surrounding survey engine calls when a participant submits.
    ///
    /// # Errors
    ///
    /// Fails when the survey has no table or no session carries `token`.
    pub fn mark_completed(
        &self,
        survey_id: SurveyId,
        token: &SessionToken,
    ) -> Result<(), ParticipantStoreError> {
        let mut tables = self.lock()?;
        let table = tables
            .get_mut(&survey_id)
            .ok_or_else(|| ParticipantStoreError::missing_table(survey_id))?;
        let position = table
            .iter()
            .position(|session| session.token() == token)
            .ok_or_else(|| {
                ParticipantStoreError::query(format!("no session holds token {token}"))
            })?;
        let completed = table.remove(position).with_completed(CompletionStatus::Completed);
        table.insert(position, completed);
        Ok(())
    }

    /// Number of sessions held for a survey; zero when not activated.
    ///
    /// # Errors
    ///
    /// Returns [`ParticipantStoreError::Connection`] when the store lock is
    /// poisoned.
    pub fn session_count(&self, survey_id: SurveyId) -> Result<usize, ParticipantStoreError> {
        let tables = self.lock()?;
        Ok(tables.get(&survey_id).map_or(0, Vec::len))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, ParticipantStoreError> {
        self.tables
            .lock()
            .map_err(|_| ParticipantStoreError::connection("participant store mutex poisoned"))
    }
}

#[async_trait]
impl ParticipantStore for MemoryParticipantStore {
    async fn table_exists(&self, survey_id: SurveyId) -> Result<bool, ParticipantStoreError> {
        let tables = self.lock()?;
        Ok(tables.contains_key(&survey_id))
    }

    async fn find_by_resource_and_user(
        &self,
        survey_id: SurveyId,
        resource_id: &str,
        user_id: &str,
    ) -> Result<Option<ParticipantSession>, ParticipantStoreError> {
        let tables = self.lock()?;
        let table = tables
            .get(&survey_id)
            .ok_or_else(|| ParticipantStoreError::missing_table(survey_id))?;
        Ok(table
            .iter()
            .find(|session| session.resource_id() == resource_id && session.user_id() == user_id)
            .cloned())
    }

    async fn create(
        &self,
        survey_id: SurveyId,
        session: NewParticipantSession,
        uniqueness: SessionUniqueness,
    ) -> Result<ParticipantSession, ParticipantStoreError> {
        let mut tables = self.lock()?;
        let table = tables
            .get_mut(&survey_id)
            .ok_or_else(|| ParticipantStoreError::missing_table(survey_id))?;

        if matches!(uniqueness, SessionUniqueness::PerResourceUser)
            && table.iter().any(|existing| {
                existing.resource_id() == session.resource_id
                    && existing.user_id() == session.user_id
            })
        {
            return Err(ParticipantStoreError::conflict(
                session.resource_id,
                session.user_id,
            ));
        }

        if table
            .iter()
            .any(|existing| existing.token() == &session.token)
        {
            return Err(ParticipantStoreError::query(format!(
                "duplicate session token {}",
                session.token
            )));
        }

        let record =
            ParticipantSession::from_draft(session, CompletionStatus::NotStarted, Utc::now());
        table.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};

    const SURVEY: SurveyId = SurveyId::new(7);

    fn draft(token: &str, resource_id: &str, user_id: &str) -> NewParticipantSession {
        NewParticipantSession {
            token: SessionToken::new(token),
            resource_id: resource_id.to_owned(),
            user_id: user_id.to_owned(),
            return_url: String::new(),
            course_title: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
        }
    }

    #[fixture]
    fn store() -> MemoryParticipantStore {
        let store = MemoryParticipantStore::new();
        store.activate(SURVEY).expect("activation succeeds");
        store
    }

    #[rstest]
    #[tokio::test]
    async fn tables_exist_only_after_activation(store: MemoryParticipantStore) {
        assert!(store.table_exists(SURVEY).await.expect("lookup"));
        assert!(
            !store
                .table_exists(SurveyId::new(999))
                .await
                .expect("lookup")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn created_sessions_are_found_by_their_pair(store: MemoryParticipantStore) {
        let created = store
            .create(
                SURVEY,
                draft("tok-1", "unit42", "stu7"),
                SessionUniqueness::PerResourceUser,
            )
            .await
            .expect("create succeeds");
        assert!(!created.completed().is_completed());

        let found = store
            .find_by_resource_and_user(SURVEY, "unit42", "stu7")
            .await
            .expect("lookup succeeds")
            .expect("session exists");
        assert_eq!(found, created);

        let missing = store
            .find_by_resource_and_user(SURVEY, "unit42", "someone-else")
            .await
            .expect("lookup succeeds");
        assert!(missing.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn per_resource_user_uniqueness_surfaces_conflicts(store: MemoryParticipantStore) {
        store
            .create(
                SURVEY,
                draft("tok-1", "unit42", "stu7"),
                SessionUniqueness::PerResourceUser,
            )
            .await
            .expect("first create succeeds");

        let err = store
            .create(
                SURVEY,
                draft("tok-2", "unit42", "stu7"),
                SessionUniqueness::PerResourceUser,
            )
            .await
            .expect_err("second create must collide");
        assert!(matches!(err, ParticipantStoreError::Conflict { .. }));
        assert_eq!(store.session_count(SURVEY).expect("count"), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn unrestricted_mode_permits_duplicate_pairs(store: MemoryParticipantStore) {
        for token in ["tok-1", "tok-2", "tok-3"] {
            store
                .create(
                    SURVEY,
                    draft(token, "unit42", "stu7"),
                    SessionUniqueness::Unrestricted,
                )
                .await
                .expect("create succeeds");
        }
        assert_eq!(store.session_count(SURVEY).expect("count"), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn creating_in_a_missing_table_fails(store: MemoryParticipantStore) {
        let err = store
            .create(
                SurveyId::new(999),
                draft("tok-1", "unit42", "stu7"),
                SessionUniqueness::PerResourceUser,
            )
            .await
            .expect_err("missing table must fail");
        assert!(matches!(err, ParticipantStoreError::MissingTable { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_tokens_are_rejected(store: MemoryParticipantStore) {
        store
            .create(
                SURVEY,
                draft("tok-1", "unit42", "stu7"),
                SessionUniqueness::Unrestricted,
            )
            .await
            .expect("first create succeeds");

        let err = store
            .create(
                SURVEY,
                draft("tok-1", "unit42", "stu8"),
                SessionUniqueness::Unrestricted,
            )
            .await
            .expect_err("token reuse must fail");
        assert!(matches!(err, ParticipantStoreError::Query { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn mark_completed_blocks_resumption(store: MemoryParticipantStore) {
        let created = store
            .create(
                SURVEY,
                draft("tok-1", "unit42", "stu7"),
                SessionUniqueness::PerResourceUser,
            )
            .await
            .expect("create succeeds");

        store
            .mark_completed(SURVEY, created.token())
            .expect("completion succeeds");

        let found = store
            .find_by_resource_and_user(SURVEY, "unit42", "stu7")
            .await
            .expect("lookup succeeds")
            .expect("session exists");
        assert!(found.completed().is_completed());
        assert_eq!(found.created_at(), created.created_at());
    }

    #[rstest]
    fn marking_an_unknown_token_fails(store: MemoryParticipantStore) {
        let err = store
            .mark_completed(SURVEY, &SessionToken::new("missing"))
            .expect_err("unknown token must fail");
        assert!(matches!(err, ParticipantStoreError::Query { .. }));
    }
}
