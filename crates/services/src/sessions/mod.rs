mod clock;
mod driver;
mod engine;
mod history;
mod progress;
mod review;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use clock::{ClockSignal, SessionClock};
pub use driver::{SessionCommand, SessionDriver, SessionEvent};
pub use engine::{QuizSession, SessionOptions, SessionStatus, Step};
pub use history::{HistoryItem, ResultHistoryService, ResultId};
pub use progress::SessionProgress;
pub use review::{ExpectedAnswer, ReviewItem};
pub use workflow::{PersistOutcome, QuizLoopService};
