use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use quiz_core::model::{FinishReason, LessonId, QuizSettings, SessionId, UserId};
use storage::repository::{ResultHistory, StoredResult};

use crate::error::SessionError;

/// Storage identifier for a persisted quiz result.
pub type ResultId = i64;

/// Presentation-agnostic list item for a past attempt.
///
/// No pre-formatted strings; callers format timestamps and percentages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryItem {
    pub id: ResultId,
    pub session_id: SessionId,
    pub lesson_id: Option<LessonId>,
    pub week: Option<u32>,
    pub finished_at: DateTime<Utc>,
    pub reason: FinishReason,

    pub correct: u32,
    pub wrong: u32,
    pub ungraded: u32,
    pub earned_score: u32,
    pub possible_score: u32,
    pub percentage: u32,
}

impl HistoryItem {
    #[must_use]
    pub fn from_stored(stored: &StoredResult) -> Self {
        let record = &stored.record;
        let result = &record.result;
        Self {
            id: stored.id,
            session_id: record.session_id,
            lesson_id: record.origin.map(|o| o.lesson_id),
            week: record.origin.map(|o| o.week),
            finished_at: record.finished_at,
            reason: record.reason,
            correct: result.correct_count(),
            wrong: result.wrong_count(),
            ungraded: result.ungraded_count(),
            earned_score: result.earned_score(),
            possible_score: result.possible_score(),
            percentage: result.percentage(),
        }
    }
}

/// Read-only access to a user's past attempts.
#[derive(Clone)]
pub struct ResultHistoryService {
    history: Arc<dyn ResultHistory>,
    limit: u32,
}

impl ResultHistoryService {
    #[must_use]
    pub fn new(history: Arc<dyn ResultHistory>) -> Self {
        Self {
            history,
            limit: QuizSettings::default().history_limit(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: &QuizSettings) -> Self {
        self.limit = settings.history_limit();
        self
    }

    /// Newest attempts first, bounded by the configured history limit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the history cannot be read.
    pub async fn list_recent(&self, user_id: UserId) -> Result<Vec<HistoryItem>, SessionError> {
        let rows = self.history.list_results(user_id, self.limit).await?;
        Ok(rows.iter().map(HistoryItem::from_stored).collect())
    }

    /// Full stored record, including per-question outcomes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` (wrapping `NotFound`) if missing.
    pub async fn get(&self, id: ResultId) -> Result<StoredResult, SessionError> {
        Ok(self.history.get_result(id).await?)
    }
}
