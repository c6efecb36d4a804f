#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::SessionError;

pub use sessions::{
    ClockSignal, ExpectedAnswer, HistoryItem, PersistOutcome, QuizLoopService, QuizSession,
    ResultHistoryService, ReviewItem, SessionClock, SessionCommand, SessionDriver, SessionEvent,
    SessionOptions, SessionProgress, SessionStatus, Step,
};
