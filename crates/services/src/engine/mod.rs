mod driver;
mod state;

// Public API of the session engine.
pub use driver::{EngineDeps, SessionEngine, SessionProgress, SubmitOutcome};
pub use state::{Effect, EngineEvent, EngineState, Step, TransitionError, step};
