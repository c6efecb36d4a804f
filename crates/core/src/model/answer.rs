use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::model::ids::{OptionId, QuestionId};
use crate::model::question::{Question, QuestionKind};

/// A student's current response to one question.
///
/// Choice answers cover both single-choice and fill-in-blank questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Choice(OptionId),
    /// Partial or complete mapping from left id to the chosen right-hand text.
    Matching(BTreeMap<OptionId, String>),
    Text(String),
}

impl Answer {
    #[must_use]
    pub fn fits(&self, kind: QuestionKind) -> bool {
        matches!(
            (self, kind),
            (Answer::Choice(_), QuestionKind::SingleChoice | QuestionKind::FillBlank)
                | (Answer::Matching(_), QuestionKind::Matching)
                | (Answer::Text(_), QuestionKind::FreeResponse)
        )
    }

    /// Checks that the answer only references options or left items of `question`.
    #[must_use]
    pub fn targets(&self, question: &Question) -> bool {
        if !self.fits(question.kind()) {
            return false;
        }
        match self {
            Answer::Choice(id) => question.has_option(*id),
            Answer::Matching(map) => map.keys().all(|left| question.has_left(*left)),
            Answer::Text(_) => true,
        }
    }
}

//
// ─── ANSWER STORE ─────────────────────────────────────────────────────────────
//

/// In-memory mapping from question id to the current answer.
///
/// Holds at most one entry per question; correctness is not checked here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerStore {
    entries: HashMap<QuestionId, Answer>,
}

impl AnswerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites any previous answer for `question_id`.
    pub fn set(&mut self, question_id: QuestionId, value: Answer) {
        self.entries.insert(question_id, value);
    }

    /// Returns the stored answer, or `None` when unanswered.
    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<&Answer> {
        self.entries.get(&question_id)
    }

    pub fn clear(&mut self, question_id: QuestionId) -> Option<Answer> {
        self.entries.remove(&question_id)
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_answered(&self, question_id: QuestionId) -> bool {
        self.entries.contains_key(&question_id)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
