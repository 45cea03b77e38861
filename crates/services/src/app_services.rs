use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::analytics::AnalyticsService;
use crate::error::AppServicesError;
use crate::evaluator::{Evaluator, HttpEvaluator};
use crate::workflow::InterviewService;

/// Assembles the app-facing services over one storage backend and one
/// evaluator client.
#[derive(Clone)]
pub struct AppServices {
    interviews: Arc<InterviewService>,
    analytics: Arc<AnalyticsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, with the HTTP evaluator
    /// configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let evaluator: Arc<dyn Evaluator> = Arc::new(HttpEvaluator::from_env());
        Ok(Self::assemble(storage, evaluator, clock))
    }

    /// Build services over in-memory storage, for tests and prototyping.
    #[must_use]
    pub fn in_memory(clock: Clock, evaluator: Arc<dyn Evaluator>) -> Self {
        Self::assemble(Storage::in_memory(), evaluator, clock)
    }

    fn assemble(storage: Storage, evaluator: Arc<dyn Evaluator>, clock: Clock) -> Self {
        let interviews = Arc::new(InterviewService::new(
            clock,
            evaluator,
            Arc::clone(&storage.cache),
            Arc::clone(&storage.results),
        ));
        let analytics = Arc::new(AnalyticsService::new(clock, Arc::clone(&storage.results)));
        Self {
            interviews,
            analytics,
        }
    }

    #[must_use]
    pub fn interviews(&self) -> Arc<InterviewService> {
        Arc::clone(&self.interviews)
    }

    #[must_use]
    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics)
    }
}
