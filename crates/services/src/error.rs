//! Shared error types for the services crate.

use thiserror::Error;

use rehearse_core::model::SessionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::engine::TransitionError;

/// Errors emitted by evaluator clients.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvaluatorError {
    #[error("evaluator is not configured")]
    Disabled,
    #[error("evaluator returned an empty response")]
    EmptyResponse,
    #[error("evaluator request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `SessionEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("session persistence failed: {0}")]
    Persistence(StorageError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Errors emitted while starting or resuming an interview.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkflowError {
    #[error("question generation failed: {0}")]
    Generation(#[from] EvaluatorError),
    #[error("the generator returned no questions")]
    NoQuestions,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors emitted by `AnalyticsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalyticsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
