use chrono::{DateTime, Duration, Utc};
use rehearse_core::model::{Answer, InterviewMeta, SessionRecord, SessionState, UserId};
use rehearse_core::time::fixed_now;
use storage::repository::{CacheField, ResultsStore, SessionCache};
use storage::sqlite::SqliteStore;

fn build_record(user: &str, created_at: DateTime<Utc>) -> SessionRecord {
    let mut state = SessionState::new(vec![
        "What is ownership?".to_string(),
        "Explain lifetimes.".to_string(),
    ])
    .unwrap();
    state
        .record_answer(0, Answer::Provided("Values have a single owner.".to_string()))
        .unwrap();
    state
        .record_evaluation(0, "Solid explanation.\n\nScore: 8", Some(8))
        .unwrap();
    state.record_answer(1, Answer::Skipped).unwrap();
    state
        .record_evaluation(1, "Ideal answer: lifetimes bound borrows.", None)
        .unwrap();

    SessionRecord::from_state(
        UserId::new(user),
        InterviewMeta::new(
            Some("Technical".to_string()),
            Some("Backend Engineer".to_string()),
            None,
        ),
        &state,
        created_at,
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_session_fields() {
    let store = SqliteStore::connect("sqlite:file:memdb_sessions?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");

    let record = build_record("u1", fixed_now());
    let id = store.save(&record).await.expect("save");

    let sessions = store
        .sessions_for_user(&UserId::new("u1"))
        .await
        .expect("fetch");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, id);

    let fetched = &sessions[0].record;
    assert_eq!(fetched.questions(), record.questions());
    assert_eq!(fetched.answers()[1], Answer::Skipped);
    assert_eq!(fetched.feedbacks()[0], "Solid explanation.\n\nScore: 8");
    assert_eq!(fetched.scores().get(&0), Some(&8));
    assert_eq!(fetched.scores().get(&1), None);
    assert_eq!(fetched.meta().interview_type(), Some("Technical"));
    assert_eq!(fetched.meta().skills(), None);
    assert_eq!(fetched.created_at(), fixed_now());

    let none = store
        .sessions_for_user(&UserId::new("someone-else"))
        .await
        .expect("fetch");
    assert!(none.is_empty());
}

#[tokio::test]
async fn sqlite_stores_skip_marker_on_the_wire() {
    let store = SqliteStore::connect("sqlite:file:memdb_wire?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");

    store.save(&build_record("u1", fixed_now())).await.expect("save");

    let raw: String = sqlx::query_scalar("SELECT answers FROM sessions LIMIT 1")
        .fetch_one(store.pool())
        .await
        .expect("raw answers");
    assert!(raw.contains("\"Skipped\""));

    let raw_scores: String = sqlx::query_scalar("SELECT scores FROM sessions LIMIT 1")
        .fetch_one(store.pool())
        .await
        .expect("raw scores");
    assert_eq!(raw_scores, r#"{"0":8}"#);
}

#[tokio::test]
async fn sqlite_purge_deletes_only_older_rows() {
    let store = SqliteStore::connect("sqlite:file:memdb_purge?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");

    store
        .save(&build_record("u1", fixed_now() - Duration::days(40)))
        .await
        .expect("save old");
    store
        .save(&build_record("u1", fixed_now() - Duration::days(3)))
        .await
        .expect("save recent");

    let removed = store
        .purge_older_than(fixed_now() - Duration::days(30))
        .await
        .expect("purge");
    assert_eq!(removed, 1);

    let remaining = store
        .sessions_for_user(&UserId::new("u1"))
        .await
        .expect("fetch");
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        remaining[0].record.created_at(),
        fixed_now() - Duration::days(3)
    );

    let removed_again = store
        .purge_older_than(fixed_now() - Duration::days(30))
        .await
        .expect("purge again");
    assert_eq!(removed_again, 0);
}

#[tokio::test]
async fn sqlite_skips_undecodable_rows() {
    let store = SqliteStore::connect("sqlite:file:memdb_corrupt?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");

    store.save(&build_record("u1", fixed_now())).await.expect("save");

    sqlx::query(
        r"
            INSERT INTO sessions (
                id, user_id, questions, answers, feedbacks, scores,
                interview_type, interview_role, skills, created_at
            )
            VALUES ('bad-row', 'u1', 'not json', '[]', '[]', '{}', NULL, NULL, NULL, ?1)
        ",
    )
    .bind(fixed_now())
    .execute(store.pool())
    .await
    .expect("insert corrupt row");

    let sessions = store
        .sessions_for_user(&UserId::new("u1"))
        .await
        .expect("fetch");
    assert_eq!(sessions.len(), 1);
    assert_ne!(sessions[0].id.value(), "bad-row");
}

#[tokio::test]
async fn sqlite_cache_roundtrip_and_clear() {
    let store = SqliteStore::connect("sqlite:file:memdb_cache?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");

    store
        .store(CacheField::Questions, r#"["Q1","Q2"]"#)
        .await
        .expect("store questions");
    store
        .store(CacheField::CurrentIndex, "0")
        .await
        .expect("store index");

    assert_eq!(
        store
            .load(CacheField::Questions)
            .await
            .expect("load")
            .as_deref(),
        Some(r#"["Q1","Q2"]"#)
    );
    assert_eq!(store.load(CacheField::Scores).await.expect("load"), None);

    store
        .store(CacheField::CurrentIndex, "1")
        .await
        .expect("overwrite index");
    assert_eq!(
        store
            .load(CacheField::CurrentIndex)
            .await
            .expect("load")
            .as_deref(),
        Some("1")
    );

    store.clear().await.expect("clear");
    for field in CacheField::ALL {
        assert_eq!(store.load(field).await.expect("load"), None);
    }
}
