use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use quiz_core::model::{
    Answer, AnswerStore, FinishReason, Question, QuestionId, QuizOrigin, SessionId,
    SessionRecord, SessionResult,
};
use quiz_core::{Clock, Scorer, StandardScorer};

use super::clock::{ClockSignal, SessionClock};
use super::progress::SessionProgress;
use super::review::ReviewItem;
use crate::error::SessionError;

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// Collaborators and knobs for a session, passed in explicitly.
#[derive(Clone)]
pub struct SessionOptions {
    clock: Clock,
    scorer: Arc<dyn Scorer>,
    shuffle_matching: bool,
    seed: Option<u64>,
    origin: Option<QuizOrigin>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            clock: Clock::default_clock(),
            scorer: Arc::new(StandardScorer),
            shuffle_matching: true,
            seed: None,
            origin: None,
        }
    }
}

impl SessionOptions {
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    #[must_use]
    pub fn with_shuffle_matching(mut self, shuffle: bool) -> Self {
        self.shuffle_matching = shuffle;
        self
    }

    /// Fix the shuffle of matching columns, for reproducible sessions.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: QuizOrigin) -> Self {
        self.origin = Some(origin);
        self
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    InProgress,
    Finished,
}

/// Where navigation left the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved { index: usize },
    /// `go_previous` on the first question.
    Stayed,
    /// `go_next` on the last question finished the session.
    Finished,
}

#[derive(Debug, Clone)]
struct Completion {
    finished_at: DateTime<Utc>,
    reason: FinishReason,
    result: SessionResult,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// A single quiz attempt: ordered questions, current answers, countdown and cursor.
///
/// `in_progress` moves to `finished` exactly once. Scoring happens on that
/// transition and the result is kept for exactly one hand-off to a results sink.
pub struct QuizSession {
    id: SessionId,
    questions: Vec<Question>,
    positions: HashMap<QuestionId, usize>,
    answers: AnswerStore,
    clock: SessionClock,
    current: usize,
    started_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    matching_choices: HashMap<QuestionId, Vec<String>>,
    options: SessionOptions,
    completion: Option<Completion>,
    undelivered: bool,
}

impl QuizSession {
    /// Start a session with default options.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::start_with`].
    pub fn start(questions: Vec<Question>, duration_secs: u32) -> Result<Self, SessionError> {
        Self::start_with(questions, duration_secs, SessionOptions::default())
    }

    /// Start a session over `questions`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyQuestionSet` if `questions` is empty and
    /// `SessionError::InvalidArgument` for a zero duration, repeated question ids,
    /// or weights that sum past `u32::MAX`.
    pub fn start_with(
        questions: Vec<Question>,
        duration_secs: u32,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet);
        }
        if u32::try_from(questions.len()).is_err() {
            return Err(SessionError::invalid("too many questions for one session"));
        }

        let total_weight: u64 = questions.iter().map(|q| u64::from(q.weight())).sum();
        if u32::try_from(total_weight).is_err() {
            return Err(SessionError::invalid(format!(
                "total question weight {total_weight} is too large to score"
            )));
        }

        let mut positions = HashMap::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            if positions.insert(question.id(), index).is_some() {
                return Err(SessionError::invalid(format!(
                    "question {} appears more than once",
                    question.id()
                )));
            }
        }

        let clock = SessionClock::start(duration_secs)?;
        let started_at = options.clock.now();
        let deadline = options.clock.deadline_after(duration_secs);
        let matching_choices = shuffled_matching_choices(&questions, &options);
        let id = SessionId::random();

        debug!(
            session_id = %id,
            questions = questions.len(),
            duration_secs,
            "quiz session started"
        );

        Ok(Self {
            id,
            questions,
            positions,
            answers: AnswerStore::new(),
            clock,
            current: 0,
            started_at,
            deadline,
            matching_choices,
            options,
            completion: None,
            undelivered: false,
        })
    }

    /// Fresh attempt over the same questions with a new clock and no answers.
    ///
    /// # Errors
    ///
    /// Propagates `start_with` errors, which cannot occur for a session that
    /// already started.
    pub fn retry(&self) -> Result<Self, SessionError> {
        Self::start_with(
            self.questions.clone(),
            self.clock.duration(),
            self.options.clone(),
        )
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn origin(&self) -> Option<QuizOrigin> {
        self.options.origin
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        if self.completion.is_some() {
            SessionStatus::Finished
        } else {
            SessionStatus::InProgress
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completion.is_some()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn answer_for(&self, question_id: QuestionId) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.clock.remaining()
    }

    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        self.completion.as_ref().map(|c| &c.result)
    }

    #[must_use]
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.completion.as_ref().map(|c| c.reason)
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.completion.as_ref().map(|c| c.finished_at)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.answered_count(),
            current_index: self.current,
            remaining_secs: self.clock.remaining(),
            is_finished: self.is_finished(),
        }
    }

    /// Right-hand texts of a matching question in presentation order, fixed at start.
    #[must_use]
    pub fn matching_choices(&self, question_id: QuestionId) -> Option<&[String]> {
        self.matching_choices.get(&question_id).map(Vec::as_slice)
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Record or replace the answer for a question. Does not move the cursor.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionAlreadyFinished` after finish,
    /// `SessionError::InvalidQuestion` for an id outside the session, and
    /// `SessionError::InvalidArgument` when the answer does not fit the question.
    pub fn answer(&mut self, question_id: QuestionId, value: Answer) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        let question = self.question(question_id)?;
        if !value.fits(question.kind()) {
            return Err(SessionError::invalid(format!(
                "answer does not fit {} question {question_id}",
                question.kind()
            )));
        }
        if !value.targets(question) {
            return Err(SessionError::invalid(format!(
                "answer references options outside question {question_id}"
            )));
        }
        self.answers.set(question_id, value);
        Ok(())
    }

    /// Remove the answer for one question.
    ///
    /// # Errors
    ///
    /// Same conditions as [`QuizSession::answer`] for finished sessions and unknown ids.
    pub fn clear_answer(&mut self, question_id: QuestionId) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.question(question_id)?;
        self.answers.clear(question_id);
        Ok(())
    }

    /// Start over within the same attempt: answers cleared, cursor back to the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionAlreadyFinished` after finish.
    pub fn reset_answers(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.answers.clear_all();
        self.current = 0;
        Ok(())
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Advance the cursor. On the last question this finishes the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionAlreadyFinished` after finish.
    pub fn go_next(&mut self) -> Result<Step, SessionError> {
        self.ensure_in_progress()?;
        if self.current + 1 >= self.questions.len() {
            self.finish(FinishReason::Completed)?;
            return Ok(Step::Finished);
        }
        self.current += 1;
        Ok(Step::Moved {
            index: self.current,
        })
    }

    /// Move the cursor back; stays put on the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionAlreadyFinished` after finish.
    pub fn go_previous(&mut self) -> Result<Step, SessionError> {
        self.ensure_in_progress()?;
        if self.current == 0 {
            return Ok(Step::Stayed);
        }
        self.current -= 1;
        Ok(Step::Moved {
            index: self.current,
        })
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidArgument` for an out-of-range index and
    /// `SessionError::SessionAlreadyFinished` after finish.
    pub fn jump_to(&mut self, index: usize) -> Result<Step, SessionError> {
        self.ensure_in_progress()?;
        if index >= self.questions.len() {
            return Err(SessionError::invalid(format!(
                "index {index} out of range 0..{}",
                self.questions.len()
            )));
        }
        self.current = index;
        Ok(Step::Moved { index })
    }

    //
    // ─── TIME ──────────────────────────────────────────────────────────────────
    //

    /// Advance the countdown by one second, finishing the session on expiry.
    ///
    /// Returns `ClockSignal::Expired` on the tick that finished the session. If
    /// scoring fails on expiry the session stays in progress and every later
    /// tick tries to finish it again.
    ///
    /// # Errors
    ///
    /// Propagates scorer failures raised while finishing.
    pub fn tick(&mut self) -> Result<ClockSignal, SessionError> {
        let signal = self.clock.tick();
        if self.clock.is_expired() && !self.is_finished() {
            self.finish(FinishReason::TimedOut)?;
            return Ok(ClockSignal::Expired);
        }
        Ok(signal)
    }

    /// # Errors
    ///
    /// Returns `SessionError::SessionAlreadyFinished` after finish.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.clock.pause();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::SessionAlreadyFinished` after finish.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.clock.resume();
        Ok(())
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    //
    // ─── FINISH ────────────────────────────────────────────────────────────────
    //

    /// Finish immediately, wherever the cursor is.
    ///
    /// Calling this again after the session finished returns the first result
    /// without scoring again.
    ///
    /// # Errors
    ///
    /// Propagates scorer failures; the session stays in progress in that case.
    pub fn finish_now(&mut self) -> Result<&SessionResult, SessionError> {
        let reason = if self.clock.is_expired() {
            FinishReason::TimedOut
        } else {
            FinishReason::FinishedEarly
        };
        self.finish(reason)
    }

    fn finish(&mut self, reason: FinishReason) -> Result<&SessionResult, SessionError> {
        let completion = match self.completion.take() {
            Some(done) => done,
            None => {
                let result = self.options.scorer.score(&self.questions, &self.answers)?;
                self.clock.stop();
                self.undelivered = true;
                let finished_at = self.options.clock.now().max(self.started_at);
                debug!(
                    session_id = %self.id,
                    %reason,
                    percentage = result.percentage(),
                    "quiz session finished"
                );
                Completion {
                    finished_at,
                    reason,
                    result,
                }
            }
        };
        let done = self.completion.insert(completion);
        Ok(&done.result)
    }

    /// Hand out the finished record. Returns `Some` exactly once per session.
    pub fn take_record(&mut self) -> Option<SessionRecord> {
        if !self.undelivered {
            return None;
        }
        let done = self.completion.as_ref()?;
        self.undelivered = false;
        Some(SessionRecord {
            session_id: self.id,
            origin: self.options.origin,
            started_at: self.started_at,
            finished_at: done.finished_at,
            reason: done.reason,
            result: done.result.clone(),
        })
    }

    /// Per-question review, available once the session is finished.
    #[must_use]
    pub fn review(&self) -> Option<Vec<ReviewItem>> {
        let done = self.completion.as_ref()?;
        Some(
            self.questions
                .iter()
                .zip(done.result.per_question())
                .map(|(q, outcome)| ReviewItem::new(q, self.answers.get(q.id()), *outcome))
                .collect(),
        )
    }

    /// An expired clock closes the session to input even while finishing is pending.
    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.is_finished() || self.clock.is_expired() {
            return Err(SessionError::SessionAlreadyFinished);
        }
        Ok(())
    }

    fn question(&self, question_id: QuestionId) -> Result<&Question, SessionError> {
        self.positions
            .get(&question_id)
            .map(|&index| &self.questions[index])
            .ok_or(SessionError::InvalidQuestion(question_id))
    }
}

fn shuffled_matching_choices(
    questions: &[Question],
    options: &SessionOptions,
) -> HashMap<QuestionId, Vec<String>> {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    questions
        .iter()
        .filter(|q| !q.pairs().is_empty())
        .map(|q| {
            let mut choices: Vec<String> = q.pairs().iter().map(|p| p.right_text.clone()).collect();
            if options.shuffle_matching {
                choices.shuffle(&mut rng);
                // never show the right column in pair order
                if choices.len() > 1 && in_pair_order(q, &choices) {
                    choices.rotate_left(1);
                }
            }
            (q.id(), choices)
        })
        .collect()
}

fn in_pair_order(question: &Question, choices: &[String]) -> bool {
    question
        .pairs()
        .iter()
        .zip(choices)
        .all(|(pair, choice)| pair.right_text == *choice)
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("id", &self.id)
            .field("questions_len", &self.questions.len())
            .field("answered", &self.answers.answered_count())
            .field("current", &self.current)
            .field("remaining_secs", &self.clock.remaining())
            .field("started_at", &self.started_at)
            .field("deadline", &self.deadline)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
