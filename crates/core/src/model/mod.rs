mod answer;
mod ids;
mod question;
mod result;
mod settings;

pub use ids::{LessonId, OptionId, ParseIdError, QuestionId, SessionId, UserId};

pub use answer::{Answer, AnswerStore};
pub use question::{ChoiceOption, MatchPair, Question, QuestionBody, QuestionError, QuestionKind};
pub use result::{
    FinishReason, QuestionOutcome, QuizOrigin, ResultError, SessionRecord, SessionResult,
    percentage,
};
pub use settings::{QuizSettings, SettingsError};
