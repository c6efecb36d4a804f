use serde::Serialize;

use quiz_core::model::{
    Answer, OptionId, Question, QuestionBody, QuestionId, QuestionKind, QuestionOutcome,
};

/// What a fully correct answer looks like, for post-quiz review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectedAnswer {
    Option { id: OptionId, text: String },
    Pairs { pairs: Vec<(String, String)> },
    ModelAnswer { text: String },
}

impl ExpectedAnswer {
    /// Returns `None` only for a choice question without a correct option,
    /// which validated questions never have.
    #[must_use]
    pub fn for_question(question: &Question) -> Option<Self> {
        match question.body() {
            QuestionBody::SingleChoice { .. } | QuestionBody::FillBlank { .. } => {
                question.correct_option().map(|o| ExpectedAnswer::Option {
                    id: o.id,
                    text: o.text.clone(),
                })
            }
            QuestionBody::Matching { pairs } => Some(ExpectedAnswer::Pairs {
                pairs: pairs
                    .iter()
                    .map(|p| (p.left_text.clone(), p.right_text.clone()))
                    .collect(),
            }),
            QuestionBody::FreeResponse { model_answer } => Some(ExpectedAnswer::ModelAnswer {
                text: model_answer.clone(),
            }),
        }
    }
}

/// One reviewed question of a finished session.
///
/// Presentation-agnostic: no pre-formatted strings beyond the content itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewItem {
    pub question_id: QuestionId,
    pub kind: QuestionKind,
    pub prompt: String,
    pub given: Option<Answer>,
    pub expected: Option<ExpectedAnswer>,
    pub outcome: QuestionOutcome,
    pub explanation: Option<String>,
}

impl ReviewItem {
    #[must_use]
    pub fn new(question: &Question, given: Option<&Answer>, outcome: QuestionOutcome) -> Self {
        Self {
            question_id: question.id(),
            kind: question.kind(),
            prompt: question.text().to_owned(),
            given: given.cloned(),
            expected: ExpectedAnswer::for_question(question),
            outcome,
            explanation: question.explanation().map(str::to_owned),
        }
    }

    /// Free-response items wait for a human grader.
    #[must_use]
    pub fn needs_grading(&self) -> bool {
        !self.outcome.graded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{MatchPair, QuestionId};
    use quiz_core::scoring::evaluate;
    use std::collections::BTreeMap;

    #[test]
    fn matching_review_lists_expected_pairs() {
        let question = Question::matching(
            QuestionId::new(4),
            "Match",
            vec![
                MatchPair::new(OptionId::new(1), "sun", "güneş"),
                MatchPair::new(OptionId::new(2), "moon", "ay"),
            ],
        )
        .unwrap();
        let given = Answer::Matching(BTreeMap::from([(OptionId::new(1), "güneş".to_owned())]));
        let item = ReviewItem::new(&question, Some(&given), evaluate(&question, Some(&given)));

        assert!(!item.outcome.is_correct);
        assert!(!item.needs_grading());
        assert_eq!(
            item.expected,
            Some(ExpectedAnswer::Pairs {
                pairs: vec![
                    ("sun".to_owned(), "güneş".to_owned()),
                    ("moon".to_owned(), "ay".to_owned()),
                ],
            })
        );
    }

    #[test]
    fn serializes_with_kind_tags() {
        let question = Question::free_response(QuestionId::new(2), "Why?", "Because").unwrap();
        let item = ReviewItem::new(&question, None, evaluate(&question, None));
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["kind"], "free_response");
        assert_eq!(json["given"], serde_json::Value::Null);
        assert_eq!(json["expected"]["kind"], "model_answer");
        assert_eq!(json["expected"]["text"], "Because");
        assert_eq!(json["outcome"]["graded"], false);
    }
}
