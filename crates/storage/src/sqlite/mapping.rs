use chrono::{DateTime, Utc};
use quiz_core::model::{
    FinishReason, LessonId, Question, QuestionBody, QuestionId, QuestionKind, QuestionOutcome,
    QuizOrigin, SessionId, SessionRecord, SessionResult, UserId,
};
use sqlx::Row;

use crate::repository::{StorageError, StoredResult};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = QuestionId::new(i64_to_u64("id", row.try_get::<i64, _>("id").map_err(ser)?)?);
    let text: String = row.try_get("text").map_err(ser)?;
    let weight = u32_from_i64("weight", row.try_get::<i64, _>("weight").map_err(ser)?)?;
    let kind: QuestionKind = row
        .try_get::<String, _>("kind")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let body: QuestionBody =
        serde_json::from_str(&row.try_get::<String, _>("body").map_err(ser)?).map_err(ser)?;
    if body.kind() != kind {
        return Err(StorageError::Serialization(format!(
            "question {id}: kind column {kind} does not match body {}",
            body.kind()
        )));
    }
    let explanation: Option<String> = row.try_get("explanation").map_err(ser)?;

    let question = Question::new(id, text, weight, body).map_err(ser)?;
    Ok(match explanation {
        Some(text) => question.with_explanation(text),
        None => question,
    })
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredResult, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let session_id: SessionId = row
        .try_get::<String, _>("session_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let user_id = UserId::new(i64_to_u64(
        "user_id",
        row.try_get::<i64, _>("user_id").map_err(ser)?,
    )?);

    let lesson_id: Option<i64> = row.try_get("lesson_id").map_err(ser)?;
    let week: Option<i64> = row.try_get("week").map_err(ser)?;
    let origin = match (lesson_id, week) {
        (Some(lesson_id), Some(week)) => Some(QuizOrigin {
            lesson_id: LessonId::new(i64_to_u64("lesson_id", lesson_id)?),
            week: u32_from_i64("week", week)?,
        }),
        _ => None,
    };

    let started_at: DateTime<Utc> = row.try_get("started_at").map_err(ser)?;
    let finished_at: DateTime<Utc> = row.try_get("finished_at").map_err(ser)?;
    let reason: FinishReason = row
        .try_get::<String, _>("reason")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let per_question: Vec<QuestionOutcome> =
        serde_json::from_str(&row.try_get::<String, _>("per_question").map_err(ser)?)
            .map_err(ser)?;
    let result = SessionResult::from_persisted(
        u32_from_i64("correct_count", row.try_get("correct_count").map_err(ser)?)?,
        u32_from_i64("wrong_count", row.try_get("wrong_count").map_err(ser)?)?,
        u32_from_i64("ungraded_count", row.try_get("ungraded_count").map_err(ser)?)?,
        u32_from_i64("earned_score", row.try_get("earned_score").map_err(ser)?)?,
        u32_from_i64("possible_score", row.try_get("possible_score").map_err(ser)?)?,
        per_question,
    )
    .map_err(ser)?;

    let record = SessionRecord::new(session_id, origin, started_at, finished_at, reason, result)
        .map_err(ser)?;
    Ok(StoredResult {
        id,
        user_id,
        record,
    })
}
