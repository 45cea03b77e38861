//! Session driver: runs the pure state machine against the evaluator,
//! the session cache, and the results store.
//!
//! In-flight progress is cached one field at a time as JSON, so a session
//! interrupted at any point can be resumed from whatever made it to disk.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use rehearse_core::model::{
    Answer, InterviewMeta, SessionError, SessionId, SessionRecord, SessionState, UserId,
};
use rehearse_core::{Clock, extract_score};
use storage::repository::{CacheField, ResultsStore, SessionCache, StorageError};

use super::state::{Effect, EngineEvent, EngineState, step};
use crate::error::EngineError;
use crate::evaluator::Evaluator;

/// Collaborators a session engine runs against.
#[derive(Clone)]
pub struct EngineDeps {
    pub evaluator: Arc<dyn Evaluator>,
    pub cache: Arc<dyn SessionCache>,
    pub store: Arc<dyn ResultsStore>,
    pub clock: Clock,
}

impl EngineDeps {
    #[must_use]
    pub fn new(
        evaluator: Arc<dyn Evaluator>,
        cache: Arc<dyn SessionCache>,
        store: Arc<dyn ResultsStore>,
        clock: Clock,
    ) -> Self {
        Self {
            evaluator,
            cache,
            store,
            clock,
        }
    }
}

/// What the caller learns from one answer submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Index of the question this outcome belongs to.
    pub index: usize,
    /// Evaluator feedback, or the fallback text when evaluation failed.
    pub feedback: String,
    /// Extracted score. `None` for skipped questions and failed
    /// evaluations; feedback without a score line yields `Some(0)`.
    pub score: Option<u8>,
    /// Whether this submission completed and persisted the session.
    pub is_complete: bool,
    /// Set once the session has been persisted.
    pub session_id: Option<SessionId>,
}

/// Aggregated progress view for displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

/// Drives one interview session from the first question to the persisted
/// record.
///
/// All session plumbing lives here; the legal transitions themselves are
/// decided by [`step`](super::state::step). Cache writes are best effort:
/// a failed write is logged and the session carries on, since the cache
/// only exists to survive restarts.
pub struct SessionEngine {
    state: EngineState,
    session: SessionState,
    user: UserId,
    meta: InterviewMeta,
    session_id: Option<SessionId>,
    deps: EngineDeps,
}

impl SessionEngine {
    /// Starts a new session over `questions` and caches it, overwriting
    /// any earlier cached session.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Session` when `questions` is empty.
    pub async fn begin(
        deps: EngineDeps,
        user: UserId,
        meta: InterviewMeta,
        questions: Vec<String>,
    ) -> Result<Self, EngineError> {
        let session = SessionState::new(questions)?;
        let engine = Self {
            state: EngineState::AwaitingAnswer { index: 0 },
            session,
            user,
            meta,
            session_id: None,
            deps,
        };
        engine.cache_snapshot().await;
        Ok(engine)
    }

    /// Resumes the cached in-flight session, if any.
    ///
    /// Missing progress fields fall back to an empty map and index zero.
    /// A snapshot that cannot be decoded, or that violates the session
    /// invariants, is discarded along with the rest of the cache and
    /// yields `None`; so do stray progress fields without a question set.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Persistence` when the cache itself cannot be
    /// read.
    pub async fn resume(
        deps: EngineDeps,
        user: UserId,
        meta: InterviewMeta,
    ) -> Result<Option<Self>, EngineError> {
        let Some(questions) = load_raw(deps.cache.as_ref(), CacheField::Questions).await? else {
            clear_quietly(deps.cache.as_ref()).await;
            return Ok(None);
        };
        let snapshot = CachedSnapshot {
            questions,
            answers: load_raw(deps.cache.as_ref(), CacheField::Answers).await?,
            feedbacks: load_raw(deps.cache.as_ref(), CacheField::Feedbacks).await?,
            scores: load_raw(deps.cache.as_ref(), CacheField::Scores).await?,
            current_index: load_raw(deps.cache.as_ref(), CacheField::CurrentIndex).await?,
        };

        match rehydrate(snapshot) {
            Ok(session) => {
                let index = session.current_index();
                Ok(Some(Self {
                    state: EngineState::AwaitingAnswer { index },
                    session,
                    user,
                    meta,
                    session_id: None,
                    deps,
                }))
            }
            Err(e) => {
                tracing::warn!("cached session is unreadable, discarding it: {}", e);
                clear_quietly(deps.cache.as_ref()).await;
                Ok(None)
            }
        }
    }

    /// Submits the answer for the current question, waits out its
    /// evaluation, and advances the session.
    ///
    /// Evaluator failures are absorbed: the question gets fallback
    /// feedback, no score, and the session moves on. After the last
    /// question the finished session is persisted; if that save fails the
    /// engine enters the failed state with the cache intact, ready for
    /// [`retry_save`](Self::retry_save).
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Transition` when no answer is currently
    /// expected and `EngineError::Persistence` when the final save fails.
    pub async fn submit_answer(&mut self, answer: Answer) -> Result<SubmitOutcome, EngineError> {
        let index = self.session.current_index();
        self.drive(EngineEvent::Submitted { answer }).await?;

        let feedback = self.session.feedback(index).unwrap_or_default().to_string();
        let score = self.session.scores().get(&index).copied();
        Ok(SubmitOutcome {
            index,
            feedback,
            score,
            is_complete: matches!(self.state, EngineState::Completed),
            session_id: self.session_id.clone(),
        })
    }

    /// Steps back to the previous question so it can be re-answered.
    /// Returns the new current index.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Transition` at the first question, or when
    /// the session is not waiting for an answer.
    pub async fn go_back(&mut self) -> Result<usize, EngineError> {
        self.drive(EngineEvent::WentBack).await?;
        Ok(self.session.current_index())
    }

    /// Retries persisting a finished session whose save failed. Returns
    /// the stored session id; calling this after a successful save just
    /// returns the id again.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Transition` when the session has not failed
    /// and `EngineError::Persistence` when the save fails again.
    pub async fn retry_save(&mut self) -> Result<SessionId, EngineError> {
        if let Some(id) = &self.session_id {
            return Ok(id.clone());
        }
        self.drive(EngineEvent::RetrySave).await?;
        self.session_id.clone().ok_or_else(|| {
            EngineError::Persistence(StorageError::Connection(
                "save finished without a session id".to_string(),
            ))
        })
    }

    /// Feeds `event` through the state machine, running effects until no
    /// follow-up event remains.
    async fn drive(&mut self, event: EngineEvent) -> Result<(), EngineError> {
        let mut save_error = None;
        let mut pending = Some(event);
        while let Some(event) = pending.take() {
            let outcome = step(&self.state, event, self.session.last_index())?;
            self.state = outcome.next;
            for effect in outcome.effects {
                if let Some(next) = self.apply(effect, &mut save_error).await? {
                    pending = Some(next);
                }
            }
        }
        match save_error {
            Some(e) => Err(EngineError::Persistence(e)),
            None => Ok(()),
        }
    }

    async fn apply(
        &mut self,
        effect: Effect,
        save_error: &mut Option<StorageError>,
    ) -> Result<Option<EngineEvent>, EngineError> {
        match effect {
            Effect::RecordAnswer { index, answer } => {
                self.session.record_answer(index, answer)?;
                self.cache_field(CacheField::Answers, self.session.answers())
                    .await;
                self.cache_field(CacheField::Scores, self.session.scores())
                    .await;
                Ok(None)
            }
            Effect::Dispatch { index, skipped } => {
                let Some(question) = self.session.question(index) else {
                    return Err(EngineError::Session(SessionError::IndexOutOfRange {
                        index,
                        len: self.session.question_count(),
                    }));
                };
                let question = question.to_string();
                let result = if skipped {
                    self.deps.evaluator.ideal_answer(&question).await
                } else {
                    let answer = self
                        .session
                        .answer(index)
                        .and_then(Answer::text)
                        .unwrap_or_default()
                        .to_string();
                    self.deps.evaluator.evaluate(&question, &answer).await
                };
                Ok(Some(match result {
                    Ok(feedback) => {
                        let score = if skipped {
                            None
                        } else {
                            Some(extract_score(&feedback))
                        };
                        EngineEvent::EvaluationArrived { feedback, score }
                    }
                    Err(e) => {
                        tracing::warn!("evaluation for question {} failed: {}", index, e);
                        EngineEvent::EvaluationFailed {
                            reason: e.to_string(),
                        }
                    }
                }))
            }
            Effect::RecordFeedback {
                index,
                feedback,
                score,
            } => {
                self.session.record_evaluation(index, feedback, score)?;
                self.cache_field(CacheField::Feedbacks, self.session.feedbacks())
                    .await;
                self.cache_field(CacheField::Scores, self.session.scores())
                    .await;
                Ok(Some(EngineEvent::Advance))
            }
            Effect::AdvanceCursor => {
                let index = self.session.advance();
                self.cache_field(CacheField::CurrentIndex, &index).await;
                Ok(None)
            }
            Effect::RewindCursor => {
                let index = self.session.retreat();
                self.cache_field(CacheField::CurrentIndex, &index).await;
                Ok(None)
            }
            Effect::Save => {
                let record = SessionRecord::from_state(
                    self.user.clone(),
                    self.meta.clone(),
                    &self.session,
                    self.deps.clock.now(),
                )?;
                Ok(Some(match self.deps.store.save(&record).await {
                    Ok(id) => {
                        self.session_id = Some(id);
                        EngineEvent::SaveSucceeded
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        *save_error = Some(e);
                        EngineEvent::SaveFailed { reason }
                    }
                }))
            }
            Effect::ClearCache => {
                if let Err(e) = self.deps.cache.clear().await {
                    tracing::warn!("failed to clear the session cache after save: {}", e);
                }
                Ok(None)
            }
        }
    }

    async fn cache_snapshot(&self) {
        self.cache_field(CacheField::Questions, self.session.questions())
            .await;
        self.cache_field(CacheField::Answers, self.session.answers())
            .await;
        self.cache_field(CacheField::Feedbacks, self.session.feedbacks())
            .await;
        self.cache_field(CacheField::Scores, self.session.scores())
            .await;
        self.cache_field(CacheField::CurrentIndex, &self.session.current_index())
            .await;
    }

    async fn cache_field<T: Serialize + ?Sized>(&self, field: CacheField, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => {
                if let Err(e) = self.deps.cache.store(field, &json).await {
                    tracing::warn!("failed to cache {}: {}", field.as_key(), e);
                }
            }
            Err(e) => tracing::warn!("failed to encode {} for the cache: {}", field.as_key(), e),
        }
    }

    // ─── ACCESSORS ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    #[must_use]
    pub fn meta(&self) -> &InterviewMeta {
        &self.meta
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.session.current_index()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&str> {
        self.session.question(self.session.current_index())
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.session.question_count();
        let answered = self.session.answered_count();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: matches!(self.state, EngineState::Completed),
        }
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("user", &self.user)
            .field("state", &self.state)
            .field("current_index", &self.session.current_index())
            .finish_non_exhaustive()
    }
}

// ─── CACHE SNAPSHOT DECODING ───────────────────────────────────────────────────

struct CachedSnapshot {
    questions: String,
    answers: Option<String>,
    feedbacks: Option<String>,
    scores: Option<String>,
    current_index: Option<String>,
}

fn rehydrate(snapshot: CachedSnapshot) -> Result<SessionState, SessionError> {
    let questions: Vec<String> = decode_field("questions", &snapshot.questions)?;
    let answers: BTreeMap<usize, Answer> = decode_optional("answers", snapshot.answers.as_deref())?;
    let feedbacks: BTreeMap<usize, String> =
        decode_optional("feedbacks", snapshot.feedbacks.as_deref())?;
    let scores: BTreeMap<usize, u8> = decode_optional("scores", snapshot.scores.as_deref())?;
    let current_index: usize =
        decode_optional("currentIndex", snapshot.current_index.as_deref())?;
    SessionState::from_parts(questions, answers, feedbacks, scores, current_index)
}

fn decode_field<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T, SessionError> {
    serde_json::from_str(raw).map_err(|e| SessionError::CorruptState(format!("cached {name}: {e}")))
}

fn decode_optional<T: DeserializeOwned + Default>(
    name: &str,
    raw: Option<&str>,
) -> Result<T, SessionError> {
    raw.map_or_else(|| Ok(T::default()), |raw| decode_field(name, raw))
}

async fn load_raw(
    cache: &dyn SessionCache,
    field: CacheField,
) -> Result<Option<String>, EngineError> {
    cache.load(field).await.map_err(EngineError::Persistence)
}

async fn clear_quietly(cache: &dyn SessionCache) {
    if let Err(e) = cache.clear().await {
        tracing::warn!("failed to clear the session cache: {}", e);
    }
}

// ─── TESTS ─────────────────────────────────────────────────────────────────────
