use thiserror::Error;

use crate::model::{QuestionError, ResultError, SettingsError};

/// Umbrella error for domain validation failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Result(#[from] ResultError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
