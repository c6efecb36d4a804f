use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{LessonId, QuestionId, SessionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("finished_at is before started_at")]
    InvalidTimeRange,

    #[error("total ({total}) does not match correct + wrong + ungraded ({sum})")]
    CountMismatch { total: u32, sum: u32 },

    #[error("earned score ({earned}) exceeds possible score ({possible})")]
    ScoreOverflow { earned: u32, possible: u32 },

    #[error("too many questions for a single result: {len}")]
    TooManyQuestions { len: usize },

    #[error("total weight ({possible}) does not fit in a u32 score")]
    WeightTooLarge { possible: u64 },

    #[error("unknown finish reason: {0}")]
    UnknownReason(String),
}

/// Per-question audit line of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub is_correct: bool,
    /// False for free-response items that await a human grader.
    pub graded: bool,
    pub weight: u32,
}

/// Immutable scoring snapshot produced once when a session finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    correct_count: u32,
    wrong_count: u32,
    ungraded_count: u32,
    total_count: u32,
    earned_score: u32,
    possible_score: u32,
    percentage: u32,
    per_question: Vec<QuestionOutcome>,
}

impl SessionResult {
    /// Aggregate per-question outcomes into a result.
    ///
    /// Ungraded outcomes count toward `total_count` only.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::TooManyQuestions` if the outcome count cannot fit in `u32`,
    /// or `ResultError::WeightTooLarge` if the summed graded weight cannot.
    pub fn from_outcomes(per_question: Vec<QuestionOutcome>) -> Result<Self, ResultError> {
        let total_count = u32::try_from(per_question.len()).map_err(|_| {
            ResultError::TooManyQuestions {
                len: per_question.len(),
            }
        })?;

        let mut correct_count = 0_u32;
        let mut wrong_count = 0_u32;
        let mut ungraded_count = 0_u32;
        let mut earned = 0_u64;
        let mut possible = 0_u64;

        for outcome in &per_question {
            if !outcome.graded {
                ungraded_count = ungraded_count.saturating_add(1);
                continue;
            }
            possible += u64::from(outcome.weight);
            if outcome.is_correct {
                correct_count = correct_count.saturating_add(1);
                earned += u64::from(outcome.weight);
            } else {
                wrong_count = wrong_count.saturating_add(1);
            }
        }

        // earned <= possible, so one check covers both
        let possible_score =
            u32::try_from(possible).map_err(|_| ResultError::WeightTooLarge { possible })?;
        let earned_score =
            u32::try_from(earned).map_err(|_| ResultError::WeightTooLarge { possible })?;

        Ok(Self {
            correct_count,
            wrong_count,
            ungraded_count,
            total_count,
            earned_score,
            possible_score,
            percentage: percentage(earned_score, possible_score),
            per_question,
        })
    }

    /// Rehydrate a result from persisted storage, re-checking its totals.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::CountMismatch` or `ResultError::ScoreOverflow` if the
    /// stored aggregates are inconsistent.
    pub fn from_persisted(
        correct_count: u32,
        wrong_count: u32,
        ungraded_count: u32,
        earned_score: u32,
        possible_score: u32,
        per_question: Vec<QuestionOutcome>,
    ) -> Result<Self, ResultError> {
        let total_count = u32::try_from(per_question.len()).map_err(|_| {
            ResultError::TooManyQuestions {
                len: per_question.len(),
            }
        })?;
        let sum = correct_count
            .saturating_add(wrong_count)
            .saturating_add(ungraded_count);
        if sum != total_count {
            return Err(ResultError::CountMismatch {
                total: total_count,
                sum,
            });
        }
        if earned_score > possible_score {
            return Err(ResultError::ScoreOverflow {
                earned: earned_score,
                possible: possible_score,
            });
        }

        Ok(Self {
            correct_count,
            wrong_count,
            ungraded_count,
            total_count,
            earned_score,
            possible_score,
            percentage: percentage(earned_score, possible_score),
            per_question,
        })
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn wrong_count(&self) -> u32 {
        self.wrong_count
    }

    #[must_use]
    pub fn ungraded_count(&self) -> u32 {
        self.ungraded_count
    }

    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    #[must_use]
    pub fn earned_score(&self) -> u32 {
        self.earned_score
    }

    #[must_use]
    pub fn possible_score(&self) -> u32 {
        self.possible_score
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    #[must_use]
    pub fn per_question(&self) -> &[QuestionOutcome] {
        &self.per_question
    }
}

/// `round(earned / possible * 100)` with halves rounded up; zero when nothing is possible.
#[must_use]
pub fn percentage(earned: u32, possible: u32) -> u32 {
    if possible == 0 {
        return 0;
    }
    let earned = u64::from(earned);
    let possible = u64::from(possible);
    let rounded = (earned * 200 + possible) / (possible * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

//
// ─── FINISH REASON ─────────────────────────────────────────────────────────────
//

/// How a session reached the finished state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// "Next" pressed on the last question.
    Completed,
    /// Explicit finish before or at the last question.
    FinishedEarly,
    /// The countdown reached zero.
    TimedOut,
}

impl FinishReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::Completed => "completed",
            FinishReason::FinishedEarly => "finished_early",
            FinishReason::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinishReason {
    type Err = ResultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "finished_early" => Ok(Self::FinishedEarly),
            "timed_out" => Ok(Self::TimedOut),
            other => Err(ResultError::UnknownReason(other.to_owned())),
        }
    }
}

//
// ─── SESSION RECORD ────────────────────────────────────────────────────────────
//

/// Where the questions of a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOrigin {
    pub lesson_id: LessonId,
    pub week: u32,
}

/// A finished attempt as handed to a results sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub origin: Option<QuizOrigin>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reason: FinishReason,
    pub result: SessionResult,
}

impl SessionRecord {
    /// # Errors
    ///
    /// Returns `ResultError::InvalidTimeRange` if `finished_at` is before `started_at`.
    pub fn new(
        session_id: SessionId,
        origin: Option<QuizOrigin>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        reason: FinishReason,
        result: SessionResult,
    ) -> Result<Self, ResultError> {
        if finished_at < started_at {
            return Err(ResultError::InvalidTimeRange);
        }
        Ok(Self {
            session_id,
            origin,
            started_at,
            finished_at,
            reason,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn outcome(id: u64, is_correct: bool, graded: bool, weight: u32) -> QuestionOutcome {
        QuestionOutcome {
            question_id: QuestionId::new(id),
            is_correct,
            graded,
            weight,
        }
    }

    #[test]
    fn aggregates_counts_and_scores() {
        let result = SessionResult::from_outcomes(vec![
            outcome(1, true, true, 1),
            outcome(2, false, true, 2),
            outcome(3, false, true, 3),
        ])
        .unwrap();

        assert_eq!(result.correct_count(), 1);
        assert_eq!(result.wrong_count(), 2);
        assert_eq!(result.total_count(), 3);
        assert_eq!(result.earned_score(), 1);
        assert_eq!(result.possible_score(), 6);
        assert_eq!(result.percentage(), 17);
    }

    #[test]
    fn ungraded_items_only_count_toward_total() {
        let result =
            SessionResult::from_outcomes(vec![outcome(1, true, true, 2), outcome(2, false, false, 5)])
                .unwrap();

        assert_eq!(result.total_count(), 2);
        assert_eq!(result.ungraded_count(), 1);
        assert_eq!(result.wrong_count(), 0);
        assert_eq!(result.possible_score(), 2);
        assert_eq!(result.percentage(), 100);
    }

    #[test]
    fn oversized_total_weight_is_an_error_not_a_clamped_score() {
        let err = SessionResult::from_outcomes(vec![
            outcome(1, true, true, u32::MAX),
            outcome(2, false, true, u32::MAX),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ResultError::WeightTooLarge {
                possible: 2 * u64::from(u32::MAX)
            }
        );

        let fits = SessionResult::from_outcomes(vec![
            outcome(1, true, true, u32::MAX - 1),
            outcome(2, false, true, 1),
        ])
        .unwrap();
        assert_eq!(fits.possible_score(), u32::MAX);
        assert_eq!(fits.percentage(), 100);
    }

    #[test]
    fn percentage_is_zero_without_possible_score() {
        assert_eq!(percentage(0, 0), 0);
        let result = SessionResult::from_outcomes(vec![outcome(1, false, false, 1)]).unwrap();
        assert_eq!(result.percentage(), 0);
    }

    #[test]
    fn percentage_rounds_halves_up() {
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
    }

    #[test]
    fn persisted_totals_are_rechecked() {
        let outcomes = vec![outcome(1, true, true, 1), outcome(2, false, true, 1)];
        let err = SessionResult::from_persisted(2, 1, 0, 1, 2, outcomes.clone()).unwrap_err();
        assert_eq!(err, ResultError::CountMismatch { total: 2, sum: 3 });

        let err = SessionResult::from_persisted(1, 1, 0, 3, 2, outcomes.clone()).unwrap_err();
        assert_eq!(
            err,
            ResultError::ScoreOverflow {
                earned: 3,
                possible: 2
            }
        );

        let ok = SessionResult::from_persisted(1, 1, 0, 1, 2, outcomes).unwrap();
        assert_eq!(ok.percentage(), 50);
    }

    #[test]
    fn record_rejects_reversed_time_range() {
        let now = fixed_now();
        let result = SessionResult::from_outcomes(Vec::new()).unwrap();
        let err = SessionRecord::new(
            SessionId::random(),
            None,
            now,
            now - chrono::Duration::seconds(1),
            FinishReason::Completed,
            result,
        )
        .unwrap_err();
        assert_eq!(err, ResultError::InvalidTimeRange);
    }

    #[test]
    fn finish_reason_string_roundtrip() {
        for reason in [
            FinishReason::Completed,
            FinishReason::FinishedEarly,
            FinishReason::TimedOut,
        ] {
            assert_eq!(reason.as_str().parse::<FinishReason>().unwrap(), reason);
        }
    }
}
