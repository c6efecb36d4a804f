use quiz_core::model::{LessonId, Question};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_question_row, ser};
use crate::repository::{QuestionBank, StorageError};

#[async_trait::async_trait]
impl QuestionBank for SqliteRepository {
    async fn fetch_questions(
        &self,
        lesson_id: LessonId,
        week: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, text, weight, kind, body, explanation
                FROM questions
                WHERE lesson_id = ?1 AND week = ?2
                ORDER BY position ASC, id ASC
            ",
        )
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .bind(i64::from(week))
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn upsert_question(
        &self,
        lesson_id: LessonId,
        week: u32,
        position: u32,
        question: &Question,
    ) -> Result<(), StorageError> {
        let body = serde_json::to_string(question.body()).map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO questions (
                    id, lesson_id, week, position, text, weight, kind, body, explanation
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(id) DO UPDATE SET
                    lesson_id = excluded.lesson_id,
                    week = excluded.week,
                    position = excluded.position,
                    text = excluded.text,
                    weight = excluded.weight,
                    kind = excluded.kind,
                    body = excluded.body,
                    explanation = excluded.explanation
            ",
        )
        .bind(id_i64("question_id", question.id().value())?)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .bind(i64::from(week))
        .bind(i64::from(position))
        .bind(question.text())
        .bind(i64::from(question.weight()))
        .bind(question.kind().as_str())
        .bind(body)
        .bind(question.explanation())
        .execute(self.pool())
        .await
        .map_err(conn)?;

        Ok(())
    }
}
