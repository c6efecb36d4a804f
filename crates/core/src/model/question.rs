use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question weight must be > 0")]
    InvalidWeight,

    #[error("choice question needs at least one option")]
    NoOptions,

    #[error("choice question must have exactly one correct option, found {found}")]
    CorrectOptionCount { found: usize },

    #[error("duplicate option id {0}")]
    DuplicateOption(OptionId),

    #[error("matching question needs at least one pair")]
    NoPairs,

    #[error("duplicate matching left id {0}")]
    DuplicateLeft(OptionId),

    #[error("unknown question kind: {0}")]
    UnknownKind(String),
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// The four assessable question formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    FillBlank,
    Matching,
    FreeResponse,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::FillBlank => "fill_blank",
            QuestionKind::Matching => "matching",
            QuestionKind::FreeResponse => "free_response",
        }
    }

    /// Free-response items need a human grader and never count toward the score.
    #[must_use]
    pub fn is_auto_graded(self) -> bool {
        !matches!(self, QuestionKind::FreeResponse)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_choice" => Ok(Self::SingleChoice),
            "fill_blank" => Ok(Self::FillBlank),
            "matching" => Ok(Self::Matching),
            "free_response" => Ok(Self::FreeResponse),
            other => Err(QuestionError::UnknownKind(other.to_owned())),
        }
    }
}

//
// ─── PAYLOAD ───────────────────────────────────────────────────────────────────
//

/// One selectable option of a single-choice or fill-in-blank question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: OptionId,
    pub text: String,
    pub is_correct: bool,
}

impl ChoiceOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id,
            text: text.into(),
            is_correct,
        }
    }
}

/// A left item and the right-hand text it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left_id: OptionId,
    pub left_text: String,
    pub right_text: String,
}

impl MatchPair {
    #[must_use]
    pub fn new(left_id: OptionId, left_text: impl Into<String>, right_text: impl Into<String>) -> Self {
        Self {
            left_id,
            left_text: left_text.into(),
            right_text: right_text.into(),
        }
    }
}

/// Kind-dependent payload of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionBody {
    SingleChoice { options: Vec<ChoiceOption> },
    FillBlank { options: Vec<ChoiceOption> },
    Matching { pairs: Vec<MatchPair> },
    FreeResponse { model_answer: String },
}

impl QuestionBody {
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionBody::SingleChoice { .. } => QuestionKind::SingleChoice,
            QuestionBody::FillBlank { .. } => QuestionKind::FillBlank,
            QuestionBody::Matching { .. } => QuestionKind::Matching,
            QuestionBody::FreeResponse { .. } => QuestionKind::FreeResponse,
        }
    }

    fn validate(&self) -> Result<(), QuestionError> {
        match self {
            QuestionBody::SingleChoice { options } | QuestionBody::FillBlank { options } => {
                if options.is_empty() {
                    return Err(QuestionError::NoOptions);
                }
                let mut seen = HashSet::with_capacity(options.len());
                for option in options {
                    if !seen.insert(option.id) {
                        return Err(QuestionError::DuplicateOption(option.id));
                    }
                }
                let found = options.iter().filter(|o| o.is_correct).count();
                if found != 1 {
                    return Err(QuestionError::CorrectOptionCount { found });
                }
                Ok(())
            }
            QuestionBody::Matching { pairs } => {
                if pairs.is_empty() {
                    return Err(QuestionError::NoPairs);
                }
                let mut seen = HashSet::with_capacity(pairs.len());
                for pair in pairs {
                    if !seen.insert(pair.left_id) {
                        return Err(QuestionError::DuplicateLeft(pair.left_id));
                    }
                }
                Ok(())
            }
            QuestionBody::FreeResponse { .. } => Ok(()),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single assessable item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    weight: u32,
    body: QuestionBody,
    explanation: Option<String>,
}

impl Question {
    /// Default score value of a question.
    pub const DEFAULT_WEIGHT: u32 = 1;

    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, the weight is zero, or the
    /// payload breaks the invariants of its kind.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        weight: u32,
        body: QuestionBody,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if weight == 0 {
            return Err(QuestionError::InvalidWeight);
        }
        body.validate()?;

        Ok(Self {
            id,
            text,
            weight,
            body,
            explanation: None,
        })
    }

    /// Single-choice question with the default weight.
    ///
    /// # Errors
    ///
    /// See [`Question::new`].
    pub fn single_choice(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<ChoiceOption>,
    ) -> Result<Self, QuestionError> {
        Self::new(id, text, Self::DEFAULT_WEIGHT, QuestionBody::SingleChoice { options })
    }

    /// Fill-in-blank question with the default weight.
    ///
    /// # Errors
    ///
    /// See [`Question::new`].
    pub fn fill_blank(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<ChoiceOption>,
    ) -> Result<Self, QuestionError> {
        Self::new(id, text, Self::DEFAULT_WEIGHT, QuestionBody::FillBlank { options })
    }

    /// Matching question with the default weight.
    ///
    /// # Errors
    ///
    /// See [`Question::new`].
    pub fn matching(
        id: QuestionId,
        text: impl Into<String>,
        pairs: Vec<MatchPair>,
    ) -> Result<Self, QuestionError> {
        Self::new(id, text, Self::DEFAULT_WEIGHT, QuestionBody::Matching { pairs })
    }

    /// Free-response question with the default weight.
    ///
    /// # Errors
    ///
    /// See [`Question::new`].
    pub fn free_response(
        id: QuestionId,
        text: impl Into<String>,
        model_answer: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        Self::new(
            id,
            text,
            Self::DEFAULT_WEIGHT,
            QuestionBody::FreeResponse {
                model_answer: model_answer.into(),
            },
        )
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        let explanation = explanation.into();
        self.explanation = (!explanation.trim().is_empty()).then_some(explanation);
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn weight(&self) -> u32 {
        self.weight
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.body.kind()
    }

    #[must_use]
    pub fn body(&self) -> &QuestionBody {
        &self.body
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Options of a choice question; empty for other kinds.
    #[must_use]
    pub fn options(&self) -> &[ChoiceOption] {
        match &self.body {
            QuestionBody::SingleChoice { options } | QuestionBody::FillBlank { options } => options,
            _ => &[],
        }
    }

    /// Pairs of a matching question; empty for other kinds.
    #[must_use]
    pub fn pairs(&self) -> &[MatchPair] {
        match &self.body {
            QuestionBody::Matching { pairs } => pairs,
            _ => &[],
        }
    }

    #[must_use]
    pub fn correct_option(&self) -> Option<&ChoiceOption> {
        self.options().iter().find(|o| o.is_correct)
    }

    #[must_use]
    pub fn has_option(&self, id: OptionId) -> bool {
        self.options().iter().any(|o| o.id == id)
    }

    #[must_use]
    pub fn has_left(&self, id: OptionId) -> bool {
        self.pairs().iter().any(|p| p.left_id == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
