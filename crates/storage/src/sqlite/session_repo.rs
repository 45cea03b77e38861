use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rehearse_core::model::{SessionId, SessionRecord, UserId};

use super::SqliteStore;
use super::mapping::{encode_json, map_session_row};
use crate::repository::{ResultsStore, StorageError, StoredSession};

#[async_trait]
impl ResultsStore for SqliteStore {
    async fn save(&self, record: &SessionRecord) -> Result<SessionId, StorageError> {
        let id = uuid::Uuid::new_v4().to_string();
        let questions = encode_json("questions", &record.questions())?;
        let answers = encode_json("answers", &record.answers())?;
        let feedbacks = encode_json("feedbacks", &record.feedbacks())?;
        let scores = encode_json("scores", record.scores())?;

        let res = sqlx::query(
            r"
                INSERT INTO sessions (
                    id, user_id, questions, answers, feedbacks, scores,
                    interview_type, interview_role, skills, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(&id)
        .bind(record.user_id().value())
        .bind(&questions)
        .bind(&answers)
        .bind(&feedbacks)
        .bind(&scores)
        .bind(record.meta().interview_type())
        .bind(record.meta().interview_role())
        .bind(record.meta().skills())
        .bind(record.created_at())
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(SessionId::new(id)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Conflict)
            }
            Err(e) => Err(StorageError::Connection(e.to_string())),
        }
    }

    async fn sessions_for_user(&self, user: &UserId) -> Result<Vec<StoredSession>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, user_id, questions, answers, feedbacks, scores,
                    interview_type, interview_role, skills, created_at
                FROM sessions
                WHERE user_id = ?1
            ",
        )
        .bind(user.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        // One undecodable row must not fail the whole listing; analytics
        // runs over whatever decodes.
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match map_session_row(&row) {
                Ok(stored) => out.push(stored),
                Err(e) => {
                    tracing::warn!("skipping undecodable session row: {}", e);
                }
            }
        }

        Ok(out)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM sessions WHERE created_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(res.rows_affected())
    }
}
