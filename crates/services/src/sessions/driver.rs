use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use quiz_core::model::{Answer, OptionId, QuestionId, SessionResult};

use super::clock::ClockSignal;
use super::engine::{QuizSession, Step};
use crate::error::SessionError;

/// Student input fed to a running session.
///
/// The `*Current` variants target whichever question the cursor is on when the
/// driver applies them, not when they were sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Answer {
        question_id: QuestionId,
        answer: Answer,
    },
    AnswerCurrent(Answer),
    /// Add or replace one pair of the current matching answer.
    MatchCurrent {
        left: OptionId,
        right: String,
    },
    ClearAnswer(QuestionId),
    ClearCurrent,
    Next,
    Previous,
    JumpTo(usize),
    Pause,
    Resume,
    Finish,
}

/// What the driver observed while applying commands and ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Moved { index: usize },
    Answered { question_id: QuestionId },
    Cleared { question_id: QuestionId },
    Tick { remaining: u32 },
    Paused,
    Resumed,
    /// A command failed validation; the session is unchanged.
    Rejected { reason: String },
    /// Scoring failed on expiry. The session stays open and the next tick retries.
    FinishFailed { reason: String },
    Finished(SessionResult),
}

/// Serializes clock ticks and commands onto one event loop.
///
/// Exactly one of them is applied at a time, so the session never sees a tick
/// while a command is mid-flight.
#[derive(Debug, Clone, Copy)]
pub struct SessionDriver {
    tick_every: Duration,
}

impl Default for SessionDriver {
    fn default() -> Self {
        Self {
            tick_every: Duration::from_secs(1),
        }
    }
}

impl SessionDriver {
    const MIN_TICK: Duration = Duration::from_millis(1);

    /// Wall time between ticks. Zero is raised to one millisecond.
    #[must_use]
    pub fn with_tick_every(mut self, tick_every: Duration) -> Self {
        self.tick_every = tick_every.max(Self::MIN_TICK);
        self
    }

    #[must_use]
    pub fn tick_every(&self) -> Duration {
        self.tick_every
    }

    /// Run until the session finishes or the command channel closes.
    ///
    /// Every event is passed to `on_event`. A closed channel leaves the session
    /// in progress; the caller decides whether to finish it. Ticks missed while
    /// the runtime was busy are delivered in a burst, so the countdown keeps
    /// pace with wall time.
    ///
    /// # Errors
    ///
    /// Returns scorer failures raised by a `Finish` or `Next` command.
    pub async fn run<F>(
        &self,
        session: &mut QuizSession,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut on_event: F,
    ) -> Result<(), SessionError>
    where
        F: FnMut(SessionEvent),
    {
        let mut ticker = interval_at(Instant::now() + self.tick_every, self.tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        while !session.is_finished() {
            tokio::select! {
                _ = ticker.tick() => {
                    match session.tick() {
                        Ok(ClockSignal::Running { remaining }) => {
                            on_event(SessionEvent::Tick { remaining });
                        }
                        Ok(ClockSignal::Expired | ClockSignal::Idle) => {}
                        Err(err) => {
                            warn!(session_id = %session.id(), error = %err, "finish on expiry failed");
                            on_event(SessionEvent::FinishFailed {
                                reason: err.to_string(),
                            });
                        }
                    }
                }
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!(session_id = %session.id(), "command channel closed");
                        return Ok(());
                    };
                    match apply(session, command) {
                        Ok(Some(event)) => on_event(event),
                        Ok(None) => {}
                        Err(err @ SessionError::Result(_)) => return Err(err),
                        Err(err) => on_event(SessionEvent::Rejected {
                            reason: err.to_string(),
                        }),
                    }
                }
            }
        }

        if let Some(result) = session.result() {
            on_event(SessionEvent::Finished(result.clone()));
        }
        Ok(())
    }
}

fn apply(
    session: &mut QuizSession,
    command: SessionCommand,
) -> Result<Option<SessionEvent>, SessionError> {
    let event = match command {
        SessionCommand::Answer {
            question_id,
            answer,
        } => {
            session.answer(question_id, answer)?;
            Some(SessionEvent::Answered { question_id })
        }
        SessionCommand::AnswerCurrent(answer) => {
            let question_id = session.current_question().id();
            session.answer(question_id, answer)?;
            Some(SessionEvent::Answered { question_id })
        }
        SessionCommand::MatchCurrent { left, right } => {
            let question_id = session.current_question().id();
            let mut pairs = match session.answer_for(question_id) {
                Some(Answer::Matching(pairs)) => pairs.clone(),
                _ => BTreeMap::new(),
            };
            pairs.insert(left, right);
            session.answer(question_id, Answer::Matching(pairs))?;
            Some(SessionEvent::Answered { question_id })
        }
        SessionCommand::ClearAnswer(question_id) => {
            session.clear_answer(question_id)?;
            Some(SessionEvent::Cleared { question_id })
        }
        SessionCommand::ClearCurrent => {
            let question_id = session.current_question().id();
            session.clear_answer(question_id)?;
            Some(SessionEvent::Cleared { question_id })
        }
        SessionCommand::Next => moved(session.go_next()?),
        SessionCommand::Previous => moved(session.go_previous()?),
        SessionCommand::JumpTo(index) => moved(session.jump_to(index)?),
        SessionCommand::Pause => {
            session.pause()?;
            Some(SessionEvent::Paused)
        }
        SessionCommand::Resume => {
            session.resume()?;
            Some(SessionEvent::Resumed)
        }
        SessionCommand::Finish => {
            session.finish_now()?;
            None
        }
    };
    Ok(event)
}

fn moved(step: Step) -> Option<SessionEvent> {
    match step {
        Step::Moved { index } => Some(SessionEvent::Moved { index }),
        Step::Stayed | Step::Finished => None,
    }
}
