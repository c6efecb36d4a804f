use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the consolidated schema migration.
///
/// Creates the question bank, persisted session results and their indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: question bank + results.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER PRIMARY KEY,
                    lesson_id INTEGER NOT NULL,
                    week INTEGER NOT NULL CHECK (week >= 0),
                    position INTEGER NOT NULL CHECK (position >= 0),
                    text TEXT NOT NULL,
                    weight INTEGER NOT NULL CHECK (weight > 0),
                    kind TEXT NOT NULL,
                    body TEXT NOT NULL,
                    explanation TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_results (
                    id INTEGER PRIMARY KEY,
                    session_id TEXT NOT NULL UNIQUE,
                    user_id INTEGER NOT NULL,
                    lesson_id INTEGER,
                    week INTEGER,
                    started_at TEXT NOT NULL,
                    finished_at TEXT NOT NULL,
                    reason TEXT NOT NULL,
                    correct_count INTEGER NOT NULL CHECK (correct_count >= 0),
                    wrong_count INTEGER NOT NULL CHECK (wrong_count >= 0),
                    ungraded_count INTEGER NOT NULL CHECK (ungraded_count >= 0),
                    earned_score INTEGER NOT NULL CHECK (earned_score >= 0),
                    possible_score INTEGER NOT NULL CHECK (possible_score >= 0),
                    percentage INTEGER NOT NULL CHECK (percentage BETWEEN 0 AND 100),
                    per_question TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_lesson_week_position
                    ON questions (lesson_id, week, position, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_session_results_user_finished
                    ON session_results (user_id, finished_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
