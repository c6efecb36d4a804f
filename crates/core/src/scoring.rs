//! Pure scoring of a question set against a student's answers.

use crate::model::{
    Answer, AnswerStore, Question, QuestionBody, QuestionOutcome, ResultError, SessionResult,
};

/// Computes a `SessionResult` from questions and answers.
///
/// Implementations must be deterministic: the same inputs always yield the same result.
pub trait Scorer: Send + Sync {
    /// # Errors
    ///
    /// Returns `ResultError` only when the aggregate cannot be represented.
    fn score(&self, questions: &[Question], answers: &AnswerStore)
    -> Result<SessionResult, ResultError>;
}

/// Default scorer: exact choice match, all-or-nothing matching, free response ungraded.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScorer;

impl Scorer for StandardScorer {
    fn score(
        &self,
        questions: &[Question],
        answers: &AnswerStore,
    ) -> Result<SessionResult, ResultError> {
        score(questions, answers)
    }
}

/// Scores every question in order. Unanswered questions are incorrect.
///
/// # Errors
///
/// Returns `ResultError::TooManyQuestions` if the question count exceeds `u32`, or
/// `ResultError::WeightTooLarge` if the graded weights sum past `u32::MAX`.
pub fn score(questions: &[Question], answers: &AnswerStore) -> Result<SessionResult, ResultError> {
    let outcomes = questions
        .iter()
        .map(|q| evaluate(q, answers.get(q.id())))
        .collect();
    SessionResult::from_outcomes(outcomes)
}

/// Scores a single question.
#[must_use]
pub fn evaluate(question: &Question, answer: Option<&Answer>) -> QuestionOutcome {
    let graded = question.kind().is_auto_graded();
    let is_correct = graded && answer.is_some_and(|a| is_correct(question, a));
    QuestionOutcome {
        question_id: question.id(),
        is_correct,
        graded,
        weight: question.weight(),
    }
}

fn is_correct(question: &Question, answer: &Answer) -> bool {
    match (question.body(), answer) {
        (
            QuestionBody::SingleChoice { options } | QuestionBody::FillBlank { options },
            Answer::Choice(selected),
        ) => options.iter().any(|o| o.id == *selected && o.is_correct),
        (QuestionBody::Matching { pairs }, Answer::Matching(given)) => pairs.iter().all(|pair| {
            given
                .get(&pair.left_id)
                .is_some_and(|right| right.trim() == pair.right_text.trim())
        }),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChoiceOption, MatchPair, OptionId, QuestionId};
    use std::collections::BTreeMap;

    fn choice(id: u64, weight: u32) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            weight,
            QuestionBody::SingleChoice {
                options: vec![
                    ChoiceOption::new(OptionId::new(1), "right", true),
                    ChoiceOption::new(OptionId::new(2), "wrong", false),
                ],
            },
        )
        .unwrap()
    }

    fn capitals() -> Question {
        Question::matching(
            QuestionId::new(10),
            "Match the capitals",
            vec![
                MatchPair::new(OptionId::new(1), "Turkey", "Ankara"),
                MatchPair::new(OptionId::new(2), "France", "Paris"),
                MatchPair::new(OptionId::new(3), "Japan", "Tokyo"),
            ],
        )
        .unwrap()
    }

    fn mapping(entries: &[(u64, &str)]) -> Answer {
        Answer::Matching(
            entries
                .iter()
                .map(|(id, text)| (OptionId::new(*id), (*text).to_owned()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn weighted_choice_scenario() {
        let questions = vec![choice(1, 1), choice(2, 2), choice(3, 3)];
        let mut answers = AnswerStore::new();
        answers.set(QuestionId::new(1), Answer::Choice(OptionId::new(1)));
        answers.set(QuestionId::new(2), Answer::Choice(OptionId::new(2)));

        let result = score(&questions, &answers).unwrap();
        assert_eq!(result.correct_count(), 1);
        assert_eq!(result.wrong_count(), 2);
        assert_eq!(result.earned_score(), 1);
        assert_eq!(result.possible_score(), 6);
        assert_eq!(result.percentage(), 17);
        let flags: Vec<bool> = result.per_question().iter().map(|o| o.is_correct).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn scoring_is_deterministic() {
        let questions = vec![choice(1, 1), capitals()];
        let mut answers = AnswerStore::new();
        answers.set(QuestionId::new(1), Answer::Choice(OptionId::new(1)));
        answers.set(QuestionId::new(10), mapping(&[(1, "Ankara")]));

        let first = score(&questions, &answers).unwrap();
        for _ in 0..5 {
            assert_eq!(score(&questions, &answers).unwrap(), first);
        }
    }

    #[test]
    fn matching_is_all_or_nothing() {
        let questions = vec![capitals()];
        let mut answers = AnswerStore::new();
        answers.set(
            QuestionId::new(10),
            mapping(&[(1, "Ankara"), (2, "Paris"), (3, "Paris")]),
        );
        let result = score(&questions, &answers).unwrap();
        assert_eq!(result.earned_score(), 0);
        assert!(!result.per_question()[0].is_correct);

        answers.set(
            QuestionId::new(10),
            mapping(&[(1, "Ankara"), (2, " Paris "), (3, "Tokyo")]),
        );
        let result = score(&questions, &answers).unwrap();
        assert_eq!(result.earned_score(), 1);
        assert!(result.per_question()[0].is_correct);
    }

    #[test]
    fn partial_matching_map_is_incorrect() {
        let questions = vec![capitals()];
        let mut answers = AnswerStore::new();
        answers.set(QuestionId::new(10), mapping(&[(1, "Ankara"), (2, "Paris")]));
        let result = score(&questions, &answers).unwrap();
        assert_eq!(result.correct_count(), 0);
        assert_eq!(result.wrong_count(), 1);
    }

    #[test]
    fn unanswered_questions_are_incorrect_not_errors() {
        let questions = vec![choice(1, 1), capitals()];
        let result = score(&questions, &AnswerStore::new()).unwrap();
        assert_eq!(result.correct_count(), 0);
        assert_eq!(result.wrong_count(), 2);
        assert_eq!(result.percentage(), 0);
    }

    #[test]
    fn free_response_is_never_auto_graded() {
        let essay = Question::free_response(QuestionId::new(5), "Explain erosion", "Wind and water")
            .unwrap();
        let mut answers = AnswerStore::new();
        answers.set(QuestionId::new(5), Answer::Text("Wind and water".into()));

        let result = score(&[essay], &answers).unwrap();
        assert_eq!(result.total_count(), 1);
        assert_eq!(result.correct_count(), 0);
        assert_eq!(result.ungraded_count(), 1);
        assert_eq!(result.possible_score(), 0);
        assert_eq!(result.percentage(), 0);
        assert!(!result.per_question()[0].graded);
    }

    #[test]
    fn mismatched_answer_shape_scores_incorrect() {
        let q = choice(1, 1);
        let outcome = evaluate(&q, Some(&Answer::Text("right".into())));
        assert!(!outcome.is_correct);
        assert!(outcome.graded);
    }

    #[test]
    fn fill_blank_uses_correct_flag() {
        let q = Question::fill_blank(
            QuestionId::new(7),
            "Water boils at ___ degrees",
            vec![
                ChoiceOption::new(OptionId::new(1), "90", false),
                ChoiceOption::new(OptionId::new(2), "100", true),
            ],
        )
        .unwrap();
        assert!(evaluate(&q, Some(&Answer::Choice(OptionId::new(2)))).is_correct);
        assert!(!evaluate(&q, Some(&Answer::Choice(OptionId::new(1)))).is_correct);
        assert!(!evaluate(&q, None).is_correct);
    }

    #[test]
    fn standard_scorer_delegates_to_score() {
        let questions = vec![choice(1, 4)];
        let mut answers = AnswerStore::new();
        answers.set(QuestionId::new(1), Answer::Choice(OptionId::new(1)));
        assert_eq!(
            StandardScorer.score(&questions, &answers).unwrap(),
            score(&questions, &answers).unwrap()
        );
    }
}
