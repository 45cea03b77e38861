use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rehearse_core::model::{SessionId, SessionRecord, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted session together with the id the store assigned to it.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub id: SessionId,
    pub record: SessionRecord,
}

impl StoredSession {
    #[must_use]
    pub fn new(id: SessionId, record: SessionRecord) -> Self {
        Self { id, record }
    }
}

/// Append-only store for completed interview sessions.
#[async_trait]
pub trait ResultsStore: Send + Sync {
    /// Persist a completed session. The store assigns and returns the id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn save(&self, record: &SessionRecord) -> Result<SessionId, StorageError>;

    /// Fetch every stored session for a user, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport failure. Individual rows that
    /// cannot be decoded are skipped, not errors.
    async fn sessions_for_user(&self, user: &UserId) -> Result<Vec<StoredSession>, StorageError>;

    /// Delete sessions created strictly before `cutoff`. Returns how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the sweep cannot be executed.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError>;
}

/// The per-field keys an in-progress session is cached under.
///
/// Key strings are the persisted representation and must stay stable
/// across releases; caches written by older builds resume against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheField {
    Questions,
    Answers,
    Feedbacks,
    Scores,
    CurrentIndex,
}

impl CacheField {
    pub const ALL: [CacheField; 5] = [
        CacheField::Questions,
        CacheField::Answers,
        CacheField::Feedbacks,
        CacheField::Scores,
        CacheField::CurrentIndex,
    ];

    #[must_use]
    pub const fn as_key(self) -> &'static str {
        match self {
            CacheField::Questions => "questions",
            CacheField::Answers => "answers",
            CacheField::Feedbacks => "feedbacks",
            CacheField::Scores => "scores",
            CacheField::CurrentIndex => "currentIndex",
        }
    }
}

/// Transient per-field cache holding the progress of the one in-flight
/// session, so an interrupted interview can resume where it stopped.
///
/// Values are opaque strings here; the engine owns the JSON encoding.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Read one cached field.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport failure.
    async fn load(&self, field: CacheField) -> Result<Option<String>, StorageError>;

    /// Write one cached field, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn store(&self, field: CacheField, value: &str) -> Result<(), StorageError>;

    /// Drop every cached field.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be cleared.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Simple in-memory results store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ResultsStore for InMemoryStore {
    async fn save(&self, record: &SessionRecord) -> Result<SessionId, StorageError> {
        let id = SessionId::new(uuid::Uuid::new_v4().to_string());
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(id.clone(), record.clone());
        Ok(id)
    }

    async fn sessions_for_user(&self, user: &UserId) -> Result<Vec<StoredSession>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|(_, record)| record.user_id() == user)
            .map(|(id, record)| StoredSession::new(id.clone(), record.clone()))
            .collect())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let before = guard.len();
        guard.retain(|_, record| record.created_at() >= cutoff);
        Ok((before - guard.len()) as u64)
    }
}

/// In-memory cache counterpart to [`InMemoryStore`].
#[derive(Clone, Default)]
pub struct InMemoryCache {
    fields: Arc<Mutex<HashMap<CacheField, String>>>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl SessionCache for InMemoryCache {
    async fn load(&self, field: CacheField) -> Result<Option<String>, StorageError> {
        let guard = self
            .fields
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&field).cloned())
    }

    async fn store(&self, field: CacheField, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .fields
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(field, value.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self
            .fields
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clear();
        Ok(())
    }
}

/// Aggregates the results store and session cache behind trait objects for
/// easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub results: Arc<dyn ResultsStore>,
    pub cache: Arc<dyn SessionCache>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            results: Arc::new(InMemoryStore::new()),
            cache: Arc::new(InMemoryCache::new()),
        }
    }
}
