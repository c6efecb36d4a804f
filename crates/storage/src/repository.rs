use async_trait::async_trait;
use quiz_core::model::{LessonId, Question, QuestionId, SessionRecord, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("no authenticated user for this operation")]
    MissingIdentity,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── QUESTION BANK ─────────────────────────────────────────────────────────────
//

/// Supplies the ordered question list for a lesson week.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Fetch questions for a lesson week in presentation order.
    ///
    /// An empty list means no quiz is available; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn fetch_questions(
        &self,
        lesson_id: LessonId,
        week: u32,
    ) -> Result<Vec<Question>, StorageError>;

    /// Insert or replace a question at `position` within a lesson week.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(
        &self,
        lesson_id: LessonId,
        week: u32,
        position: u32,
        question: &Question,
    ) -> Result<(), StorageError>;
}

//
// ─── RESULTS SINK ──────────────────────────────────────────────────────────────
//

/// Identity attached to a persistence request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistContext {
    pub user_id: Option<UserId>,
}

impl PersistContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Persists finished attempts for authenticated users.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Store a finished session and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingIdentity` for anonymous contexts,
    /// `StorageError::Conflict` if the session was already stored, or other
    /// storage errors.
    async fn persist(
        &self,
        record: &SessionRecord,
        context: &PersistContext,
    ) -> Result<i64, StorageError>;
}

/// A persisted attempt with its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResult {
    pub id: i64,
    pub user_id: UserId,
    pub record: SessionRecord,
}

/// Read side of persisted attempts.
#[async_trait]
pub trait ResultHistory: Send + Sync {
    /// Most recent attempts for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_results(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<StoredResult>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: i64) -> Result<StoredResult, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

type QuestionSlot = (u32, Question);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<(LessonId, u32), Vec<QuestionSlot>>>>,
    results: Arc<Mutex<Vec<StoredResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted results, across all users.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn result_count(&self) -> Result<usize, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }
}

#[async_trait]
impl QuestionBank for InMemoryRepository {
    async fn fetch_questions(
        &self,
        lesson_id: LessonId,
        week: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .get(&(lesson_id, week))
            .map(|slots| slots.iter().map(|(_, q)| q.clone()).collect())
            .unwrap_or_default())
    }

    async fn upsert_question(
        &self,
        lesson_id: LessonId,
        week: u32,
        position: u32,
        question: &Question,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id: QuestionId = question.id();
        for slots in guard.values_mut() {
            slots.retain(|(_, q)| q.id() != id);
        }
        let slots = guard.entry((lesson_id, week)).or_default();
        slots.push((position, question.clone()));
        slots.sort_by_key(|(pos, q)| (*pos, q.id()));
        Ok(())
    }
}

#[async_trait]
impl ResultSink for InMemoryRepository {
    async fn persist(
        &self,
        record: &SessionRecord,
        context: &PersistContext,
    ) -> Result<i64, StorageError> {
        let user_id = context.user_id.ok_or(StorageError::MissingIdentity)?;
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard
            .iter()
            .any(|stored| stored.record.session_id == record.session_id)
        {
            return Err(StorageError::Conflict);
        }
        let id = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?
            + 1;
        guard.push(StoredResult {
            id,
            user_id,
            record: record.clone(),
        });
        Ok(id)
    }
}

#[async_trait]
impl ResultHistory for InMemoryRepository {
    async fn list_results(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<StoredResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<StoredResult> = guard
            .iter()
            .filter(|stored| stored.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.record
                .finished_at
                .cmp(&a.record.finished_at)
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn get_result(&self, id: i64) -> Result<StoredResult, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|stored| stored.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

/// Aggregates the question bank and result stores behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionBank>,
    pub results: Arc<dyn ResultSink>,
    pub history: Arc<dyn ResultHistory>,
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{
        ChoiceOption, FinishReason, OptionId, QuizOrigin, SessionId, SessionResult,
    };
    use quiz_core::time::fixed_now;

    fn question(id: u64) -> Question {
        Question::single_choice(
            QuestionId::new(id),
            format!("Q{id}"),
            vec![ChoiceOption::new(OptionId::new(1), "yes", true)],
        )
        .unwrap()
    }

    fn record(offset_secs: i64) -> SessionRecord {
        let started = fixed_now();
        SessionRecord::new(
            SessionId::random(),
            Some(QuizOrigin {
                lesson_id: LessonId::new(1),
                week: 2,
            }),
            started,
            started + Duration::seconds(offset_secs),
            FinishReason::Completed,
            SessionResult::from_outcomes(Vec::new()).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn questions_come_back_in_position_order() {
        let repo = InMemoryRepository::new();
        let lesson = LessonId::new(3);
        repo.upsert_question(lesson, 1, 2, &question(10)).await.unwrap();
        repo.upsert_question(lesson, 1, 0, &question(11)).await.unwrap();
        repo.upsert_question(lesson, 1, 1, &question(12)).await.unwrap();

        let ids: Vec<u64> = repo
            .fetch_questions(lesson, 1)
            .await
            .unwrap()
            .iter()
            .map(|q| q.id().value())
            .collect();
        assert_eq!(ids, vec![11, 12, 10]);
        assert!(repo.fetch_questions(lesson, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_moves_question_instead_of_duplicating() {
        let repo = InMemoryRepository::new();
        let lesson = LessonId::new(3);
        repo.upsert_question(lesson, 1, 0, &question(10)).await.unwrap();
        repo.upsert_question(lesson, 2, 0, &question(10)).await.unwrap();

        assert!(repo.fetch_questions(lesson, 1).await.unwrap().is_empty());
        assert_eq!(repo.fetch_questions(lesson, 2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn anonymous_persist_is_rejected() {
        let repo = InMemoryRepository::new();
        let err = repo
            .persist(&record(10), &PersistContext::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingIdentity));
        assert_eq!(repo.result_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_session_is_a_conflict() {
        let repo = InMemoryRepository::new();
        let ctx = PersistContext::for_user(UserId::new(1));
        let rec = record(10);
        repo.persist(&rec, &ctx).await.unwrap();
        let err = repo.persist(&rec, &ctx).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_per_user() {
        let repo = InMemoryRepository::new();
        let alice = PersistContext::for_user(UserId::new(1));
        let bob = PersistContext::for_user(UserId::new(2));
        let older = repo.persist(&record(10), &alice).await.unwrap();
        let newer = repo.persist(&record(60), &alice).await.unwrap();
        repo.persist(&record(30), &bob).await.unwrap();

        let rows = repo.list_results(UserId::new(1), 10).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer, older]);

        let limited = repo.list_results(UserId::new(1), 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        assert_eq!(repo.get_result(older).await.unwrap().user_id, UserId::new(1));
        assert!(matches!(
            repo.get_result(999).await.unwrap_err(),
            StorageError::NotFound
        ));
    }
}
