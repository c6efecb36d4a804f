#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, PersistContext, QuestionBank, ResultHistory, ResultSink, Storage,
    StorageError, StoredResult,
};
