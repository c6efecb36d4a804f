use quiz_core::model::{ChoiceOption, MatchPair, OptionId, Question, QuestionBody, QuestionId};

/// A small mixed quiz for trying the CLI against a fresh database.
///
/// # Errors
///
/// Returns `quiz_core::Error` if a sample question fails validation.
pub fn sample_questions() -> Result<Vec<Question>, quiz_core::Error> {
    let option = |id, text: &str, correct| ChoiceOption::new(OptionId::new(id), text, correct);

    Ok(vec![
        Question::single_choice(
            QuestionId::new(1),
            "Which gas do plants absorb from the air?",
            vec![
                option(1, "Oxygen", false),
                option(2, "Carbon dioxide", true),
                option(3, "Nitrogen", false),
            ],
        )?
        .with_explanation("Plants take in carbon dioxide for photosynthesis."),
        Question::new(
            QuestionId::new(2),
            "Water boils at ___ degrees Celsius at sea level.",
            2,
            QuestionBody::FillBlank {
                options: vec![
                    option(1, "90", false),
                    option(2, "100", true),
                    option(3, "110", false),
                ],
            },
        )?,
        Question::matching(
            QuestionId::new(3),
            "Match each country with its capital.",
            vec![
                MatchPair::new(OptionId::new(1), "France", "Paris"),
                MatchPair::new(OptionId::new(2), "Japan", "Tokyo"),
                MatchPair::new(OptionId::new(3), "Kenya", "Nairobi"),
            ],
        )?,
        Question::free_response(
            QuestionId::new(4),
            "Explain in one sentence why the sky looks blue.",
            "Shorter wavelengths of sunlight scatter more in the atmosphere.",
        )?,
    ])
}
