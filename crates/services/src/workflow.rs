//! Interview workflow: question generation glued to the session engine.

use std::sync::Arc;

use rehearse_core::Clock;
use rehearse_core::model::{InterviewMeta, UserId};
use storage::repository::{ResultsStore, SessionCache};

use crate::engine::{EngineDeps, SessionEngine};
use crate::error::WorkflowError;
use crate::evaluator::{Evaluator, GenerationRequest};

/// Starts and resumes interview sessions.
///
/// Unlike answer evaluation, question generation has no fallback: an
/// interview cannot run without questions, so a generation failure is
/// surfaced and nothing is created or cached.
#[derive(Clone)]
pub struct InterviewService {
    deps: EngineDeps,
}

impl InterviewService {
    #[must_use]
    pub fn new(
        clock: Clock,
        evaluator: Arc<dyn Evaluator>,
        cache: Arc<dyn SessionCache>,
        store: Arc<dyn ResultsStore>,
    ) -> Self {
        Self {
            deps: EngineDeps::new(evaluator, cache, store, clock),
        }
    }

    /// Generates a question set for `request` and starts a session over
    /// it, replacing any cached in-flight session.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Generation` when the evaluator call fails,
    /// `WorkflowError::NoQuestions` when it produces an empty list, and
    /// `WorkflowError::Engine` when the session cannot be started.
    pub async fn start(
        &self,
        user: UserId,
        meta: InterviewMeta,
        request: &GenerationRequest,
    ) -> Result<SessionEngine, WorkflowError> {
        let questions = self.deps.evaluator.generate_questions(request).await?;
        if questions.is_empty() {
            return Err(WorkflowError::NoQuestions);
        }
        let engine = SessionEngine::begin(self.deps.clone(), user, meta, questions).await?;
        Ok(engine)
    }

    /// Resumes the cached in-flight session, if any.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Engine` when the cache cannot be read.
    pub async fn resume(
        &self,
        user: UserId,
        meta: InterviewMeta,
    ) -> Result<Option<SessionEngine>, WorkflowError> {
        Ok(SessionEngine::resume(self.deps.clone(), user, meta).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use rehearse_core::time::fixed_clock;
    use storage::repository::Storage;

    use crate::error::EvaluatorError;

    struct EmptyGenerator;

    #[async_trait]
    impl Evaluator for EmptyGenerator {
        async fn evaluate(&self, _q: &str, _a: &str) -> Result<String, EvaluatorError> {
            Ok("Score: 5".to_string())
        }

        async fn ideal_answer(&self, _q: &str) -> Result<String, EvaluatorError> {
            Ok("Ideal.".to_string())
        }

        async fn generate_questions(
            &self,
            _r: &GenerationRequest,
        ) -> Result<Vec<String>, EvaluatorError> {
            Ok(Vec::new())
        }
    }

    struct OfflineGenerator;

    #[async_trait]
    impl Evaluator for OfflineGenerator {
        async fn evaluate(&self, _q: &str, _a: &str) -> Result<String, EvaluatorError> {
            Err(EvaluatorError::Disabled)
        }

        async fn ideal_answer(&self, _q: &str) -> Result<String, EvaluatorError> {
            Err(EvaluatorError::Disabled)
        }

        async fn generate_questions(
            &self,
            _r: &GenerationRequest,
        ) -> Result<Vec<String>, EvaluatorError> {
            Err(EvaluatorError::Disabled)
        }
    }

    fn service(evaluator: Arc<dyn Evaluator>) -> InterviewService {
        let storage = Storage::in_memory();
        InterviewService::new(fixed_clock(), evaluator, storage.cache, storage.results)
    }

    #[tokio::test]
    async fn empty_generation_does_not_start_a_session() {
        let service = service(Arc::new(EmptyGenerator));
        let err = service
            .start(
                UserId::new("u1"),
                InterviewMeta::default(),
                &GenerationRequest::new("Backend Engineer", "Senior"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NoQuestions));

        // nothing was cached either
        assert!(
            service
                .resume(UserId::new("u1"), InterviewMeta::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn generation_failure_is_fatal() {
        let service = service(Arc::new(OfflineGenerator));
        let err = service
            .start(
                UserId::new("u1"),
                InterviewMeta::default(),
                &GenerationRequest::new("Backend Engineer", "Senior"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Generation(EvaluatorError::Disabled)
        ));
    }
}
