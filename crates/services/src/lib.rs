#![forbid(unsafe_code)]

pub mod analytics;
pub mod app_services;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod workflow;

pub use rehearse_core::Clock;

pub use analytics::{AnalyticsService, SeriesPoint, TimeWindow};
pub use app_services::AppServices;
pub use error::{AnalyticsError, EngineError, EvaluatorError, WorkflowError};

pub use engine::{
    EngineDeps, EngineEvent, EngineState, SessionEngine, SessionProgress, SubmitOutcome,
    TransitionError,
};
pub use evaluator::{Evaluator, EvaluatorConfig, GenerationRequest, HttpEvaluator};
pub use workflow::InterviewService;
