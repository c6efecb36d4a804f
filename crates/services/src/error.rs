//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionId, ResultError, SettingsError};
use storage::repository::StorageError;

/// Errors emitted by quiz sessions and the services around them.
///
/// Validation variants leave the session exactly as it was before the call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no questions available for session")]
    EmptyQuestionSet,
    #[error("question {0} is not part of this session")]
    InvalidQuestion(QuestionId),
    #[error("session already finished")]
    SessionAlreadyFinished,
    #[error(transparent)]
    Result(#[from] ResultError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }
}
