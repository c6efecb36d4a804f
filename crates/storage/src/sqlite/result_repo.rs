use quiz_core::model::{SessionRecord, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_result_row, ser};
use crate::repository::{PersistContext, ResultHistory, ResultSink, StorageError, StoredResult};

const RESULT_COLUMNS: &str = r"
    id, session_id, user_id, lesson_id, week, started_at, finished_at, reason,
    correct_count, wrong_count, ungraded_count, earned_score, possible_score, per_question
";

#[async_trait::async_trait]
impl ResultSink for SqliteRepository {
    async fn persist(
        &self,
        record: &SessionRecord,
        context: &PersistContext,
    ) -> Result<i64, StorageError> {
        let user_id = context.user_id.ok_or(StorageError::MissingIdentity)?;
        let result = &record.result;
        let per_question = serde_json::to_string(result.per_question()).map_err(ser)?;
        let lesson_id = record
            .origin
            .map(|o| id_i64("lesson_id", o.lesson_id.value()))
            .transpose()?;
        let week = record.origin.map(|o| i64::from(o.week));

        let res = sqlx::query(
            r"
                INSERT INTO session_results (
                    session_id, user_id, lesson_id, week, started_at, finished_at, reason,
                    correct_count, wrong_count, ungraded_count, earned_score, possible_score,
                    percentage, per_question
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
        )
        .bind(record.session_id.to_string())
        .bind(id_i64("user_id", user_id.value())?)
        .bind(lesson_id)
        .bind(week)
        .bind(record.started_at)
        .bind(record.finished_at)
        .bind(record.reason.as_str())
        .bind(i64::from(result.correct_count()))
        .bind(i64::from(result.wrong_count()))
        .bind(i64::from(result.ungraded_count()))
        .bind(i64::from(result.earned_score()))
        .bind(i64::from(result.possible_score()))
        .bind(i64::from(result.percentage()))
        .bind(per_question)
        .execute(self.pool())
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }
}

#[async_trait::async_trait]
impl ResultHistory for SqliteRepository {
    async fn list_results(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<StoredResult>, StorageError> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM session_results
             WHERE user_id = ?1
             ORDER BY finished_at DESC, id DESC
             LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("user_id", user_id.value())?)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }

    async fn get_result(&self, id: i64) -> Result<StoredResult, StorageError> {
        let sql = format!("SELECT {RESULT_COLUMNS} FROM session_results WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }
}
