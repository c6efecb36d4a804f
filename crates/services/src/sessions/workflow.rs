use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use quiz_core::model::{LessonId, QuizOrigin, QuizSettings, SessionRecord};
use quiz_core::{Scorer, StandardScorer};
use storage::repository::{PersistContext, QuestionBank, ResultSink};

use super::engine::{QuizSession, SessionOptions};
use crate::Clock;
use crate::error::SessionError;

/// What happened to a finished session's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Persisted { id: i64 },
    /// No user identity; the sink was not called.
    Skipped,
    Failed { reason: String },
}

impl PersistOutcome {
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted { .. })
    }
}

/// Orchestrates session start from the question bank and result delivery to the sink.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    settings: QuizSettings,
    bank: Arc<dyn QuestionBank>,
    sink: Arc<dyn ResultSink>,
    scorer: Arc<dyn Scorer>,
    seed: Option<u64>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(clock: Clock, bank: Arc<dyn QuestionBank>, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            clock,
            settings: QuizSettings::default(),
            bank,
            sink,
            scorer: Arc::new(StandardScorer),
            seed: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: QuizSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Start a session for a lesson week with the configured duration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyQuestionSet` when the bank has no questions,
    /// `SessionError::Storage` if the bank cannot be read, or start errors.
    pub async fn start_session(
        &self,
        lesson_id: LessonId,
        week: u32,
    ) -> Result<QuizSession, SessionError> {
        self.start_session_with_duration(lesson_id, week, self.settings.duration_secs())
            .await
    }

    /// Start a session with an explicit duration.
    ///
    /// # Errors
    ///
    /// Same as [`QuizLoopService::start_session`], plus `InvalidArgument` for a zero duration.
    pub async fn start_session_with_duration(
        &self,
        lesson_id: LessonId,
        week: u32,
        duration_secs: u32,
    ) -> Result<QuizSession, SessionError> {
        let questions = self.bank.fetch_questions(lesson_id, week).await?;
        if questions.is_empty() {
            debug!(%lesson_id, week, "no questions for lesson week");
            return Err(SessionError::EmptyQuestionSet);
        }
        QuizSession::start_with(questions, duration_secs, self.options(lesson_id, week))
    }

    fn options(&self, lesson_id: LessonId, week: u32) -> SessionOptions {
        let options = SessionOptions::default()
            .with_clock(self.clock)
            .with_scorer(Arc::clone(&self.scorer))
            .with_shuffle_matching(self.settings.shuffle_matching())
            .with_origin(QuizOrigin { lesson_id, week });
        match self.seed {
            Some(seed) => options.with_seed(seed),
            None => options,
        }
    }

    /// Hand the finished result to the sink.
    ///
    /// Returns `None` while the session is in progress or once its result was
    /// already delivered. Failures are logged and reported, never propagated:
    /// the session stays finished either way.
    pub async fn deliver(
        &self,
        session: &mut QuizSession,
        context: &PersistContext,
    ) -> Option<PersistOutcome> {
        let record = session.take_record()?;
        if !context.is_authenticated() {
            debug!(session_id = %record.session_id, "anonymous session, result not persisted");
            return Some(PersistOutcome::Skipped);
        }
        Some(persist(self.sink.as_ref(), &record, context).await)
    }

    /// Fire-and-forget variant of [`QuizLoopService::deliver`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn deliver_detached(
        &self,
        session: &mut QuizSession,
        context: PersistContext,
    ) -> Option<JoinHandle<PersistOutcome>> {
        let record = session.take_record()?;
        if !context.is_authenticated() {
            debug!(session_id = %record.session_id, "anonymous session, result not persisted");
            return Some(tokio::spawn(async { PersistOutcome::Skipped }));
        }
        let sink = Arc::clone(&self.sink);
        Some(tokio::spawn(async move {
            persist(sink.as_ref(), &record, &context).await
        }))
    }
}

async fn persist(
    sink: &dyn ResultSink,
    record: &SessionRecord,
    context: &PersistContext,
) -> PersistOutcome {
    match sink.persist(record, context).await {
        Ok(id) => {
            info!(
                session_id = %record.session_id,
                result_id = id,
                percentage = record.result.percentage(),
                "quiz result persisted"
            );
            PersistOutcome::Persisted { id }
        }
        Err(err) => {
            warn!(session_id = %record.session_id, error = %err, "failed to persist quiz result");
            PersistOutcome::Failed {
                reason: err.to_string(),
            }
        }
    }
}

impl fmt::Debug for QuizLoopService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizLoopService")
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{ChoiceOption, OptionId, Question, QuestionBody, QuestionId};
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            1,
            QuestionBody::SingleChoice {
                options: vec![
                    ChoiceOption::new(OptionId::new(1), "yes", true),
                    ChoiceOption::new(OptionId::new(2), "no", false),
                ],
            },
        )
        .unwrap()
    }

    async fn service_with(questions: &[Question]) -> (QuizLoopService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        for (pos, q) in questions.iter().enumerate() {
            repo.upsert_question(LessonId::new(1), 1, pos as u32, q)
                .await
                .unwrap();
        }
        let service = QuizLoopService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
        .with_seed(1);
        (service, repo)
    }

    #[tokio::test]
    async fn empty_lesson_week_is_reported() {
        let (service, _) = service_with(&[]).await;
        let err = service.start_session(LessonId::new(1), 1).await.unwrap_err();
        assert!(matches!(err, SessionError::EmptyQuestionSet));
    }

    #[tokio::test]
    async fn start_uses_settings_duration_and_origin() {
        let (service, _) = service_with(&[question(1), question(2)]).await;
        let service = service.with_settings(QuizSettings::new(90, false, 5).unwrap());
        let session = service.start_session(LessonId::new(1), 1).await.unwrap();
        assert_eq!(session.remaining_secs(), 90);
        assert_eq!(session.questions().len(), 2);
        assert_eq!(
            session.origin(),
            Some(QuizOrigin {
                lesson_id: LessonId::new(1),
                week: 1
            })
        );
    }

    #[tokio::test]
    async fn deliver_once_for_authenticated_user() {
        let (service, repo) = service_with(&[question(1)]).await;
        let mut session = service.start_session(LessonId::new(1), 1).await.unwrap();
        let ctx = PersistContext::for_user(quiz_core::model::UserId::new(3));

        assert!(service.deliver(&mut session, &ctx).await.is_none());
        session.finish_now().unwrap();
        let outcome = service.deliver(&mut session, &ctx).await.unwrap();
        assert!(outcome.is_persisted());
        assert!(service.deliver(&mut session, &ctx).await.is_none());
        assert_eq!(repo.result_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn anonymous_delivery_is_skipped() {
        let (service, repo) = service_with(&[question(1)]).await;
        let mut session = service.start_session(LessonId::new(1), 1).await.unwrap();
        session.go_next().unwrap();
        let outcome = service
            .deliver(&mut session, &PersistContext::anonymous())
            .await;
        assert_eq!(outcome, Some(PersistOutcome::Skipped));
        assert_eq!(repo.result_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn detached_delivery_persists() {
        let (service, repo) = service_with(&[question(1)]).await;
        let mut session = service.start_session(LessonId::new(1), 1).await.unwrap();
        session.finish_now().unwrap();
        let handle = service
            .deliver_detached(
                &mut session,
                PersistContext::for_user(quiz_core::model::UserId::new(9)),
            )
            .unwrap();
        assert!(handle.await.unwrap().is_persisted());
        assert_eq!(repo.result_count().unwrap(), 1);
    }
}
