use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("quiz duration must be between 1 and {max} seconds, got {got}")]
    InvalidDuration { got: u32, max: u32 },

    #[error("history limit must be between 1 and {max}, got {got}")]
    InvalidHistoryLimit { got: u32, max: u32 },
}

/// Tunables shared by quiz sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSettings {
    duration_secs: u32,
    shuffle_matching: bool,
    history_limit: u32,
}

impl QuizSettings {
    pub const MAX_DURATION_SECS: u32 = 86_400;
    pub const MAX_HISTORY_LIMIT: u32 = 500;

    /// Creates validated settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the duration or history limit is out of range.
    pub fn new(
        duration_secs: u32,
        shuffle_matching: bool,
        history_limit: u32,
    ) -> Result<Self, SettingsError> {
        if duration_secs == 0 || duration_secs > Self::MAX_DURATION_SECS {
            return Err(SettingsError::InvalidDuration {
                got: duration_secs,
                max: Self::MAX_DURATION_SECS,
            });
        }
        if history_limit == 0 || history_limit > Self::MAX_HISTORY_LIMIT {
            return Err(SettingsError::InvalidHistoryLimit {
                got: history_limit,
                max: Self::MAX_HISTORY_LIMIT,
            });
        }
        Ok(Self {
            duration_secs,
            shuffle_matching,
            history_limit,
        })
    }

    /// Returns a copy with a different session duration.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidDuration` if out of range.
    pub fn with_duration_secs(self, duration_secs: u32) -> Result<Self, SettingsError> {
        Self::new(duration_secs, self.shuffle_matching, self.history_limit)
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn shuffle_matching(&self) -> bool {
        self.shuffle_matching
    }

    #[must_use]
    pub fn history_limit(&self) -> u32 {
        self.history_limit
    }
}

impl Default for QuizSettings {
    /// Ten minute quizzes, shuffled matching columns, 20 history rows.
    fn default() -> Self {
        Self {
            duration_secs: 600,
            shuffle_matching: true,
            history_limit: 20,
        }
    }
}
