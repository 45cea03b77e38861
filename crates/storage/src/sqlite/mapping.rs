use rehearse_core::model::{Answer, InterviewMeta, SessionId, SessionRecord, UserId};
use sqlx::Row;
use std::collections::BTreeMap;

use crate::repository::{StorageError, StoredSession};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn encode_json<T: serde::Serialize>(
    field: &'static str,
    value: &T,
) -> Result<String, StorageError> {
    serde_json::to_string(value)
        .map_err(|e| StorageError::Serialization(format!("encoding {field}: {e}")))
}

fn decode_json<T: serde::de::DeserializeOwned>(
    field: &'static str,
    raw: &str,
) -> Result<T, StorageError> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("decoding {field}: {e}")))
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<StoredSession, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    let questions: Vec<String> =
        decode_json("questions", &row.try_get::<String, _>("questions").map_err(ser)?)?;
    let answers: Vec<Answer> =
        decode_json("answers", &row.try_get::<String, _>("answers").map_err(ser)?)?;
    let feedbacks: Vec<String> =
        decode_json("feedbacks", &row.try_get::<String, _>("feedbacks").map_err(ser)?)?;
    let scores: BTreeMap<usize, u8> =
        decode_json("scores", &row.try_get::<String, _>("scores").map_err(ser)?)?;

    let meta = InterviewMeta::new(
        row.try_get("interview_type").map_err(ser)?,
        row.try_get("interview_role").map_err(ser)?,
        row.try_get("skills").map_err(ser)?,
    );
    let created_at = row.try_get("created_at").map_err(ser)?;

    let record = SessionRecord::from_persisted(
        UserId::new(user_id),
        questions,
        answers,
        feedbacks,
        scores,
        meta,
        created_at,
    )
    .map_err(ser)?;

    Ok(StoredSession::new(SessionId::new(id), record))
}
