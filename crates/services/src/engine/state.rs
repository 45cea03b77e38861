//! Pure session state machine.
//!
//! [`step`] maps a state and an event to the next state plus the effects
//! the driver must run. It never touches storage or the network, so every
//! transition is testable without async plumbing.

use rehearse_core::model::Answer;
use thiserror::Error;

// ─── STATES AND EVENTS ─────────────────────────────────────────────────────────

/// Where a session stands in its answer/evaluate/advance loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting for the user to answer question `index`.
    AwaitingAnswer { index: usize },
    /// Question `index` has its answer recorded and evaluation is in flight.
    Evaluating { index: usize },
    /// Evaluation for `index` landed; next comes another question or the save.
    Advancing { index: usize },
    /// The finished session was persisted. Terminal.
    Completed,
    /// Persisting the finished session failed. Progress is intact and the
    /// save can be retried.
    Failed { index: usize, reason: String },
}

impl EngineState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingAnswer { .. } => "AwaitingAnswer",
            Self::Evaluating { .. } => "Evaluating",
            Self::Advancing { .. } => "Advancing",
            Self::Completed => "Completed",
            Self::Failed { .. } => "Failed",
        }
    }
}

/// Something that happened to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The user answered or skipped the current question.
    Submitted { answer: Answer },
    /// The evaluator produced feedback. `score` is `None` for skipped
    /// questions, whose ideal answers are never scored.
    EvaluationArrived {
        feedback: String,
        score: Option<u8>,
    },
    /// The evaluator call failed; the session absorbs this and moves on.
    EvaluationFailed { reason: String },
    /// Move past the just-evaluated question.
    Advance,
    /// The user stepped back to revisit the previous question.
    WentBack,
    SaveSucceeded,
    SaveFailed { reason: String },
    RetrySave,
}

impl EngineEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "Submitted",
            Self::EvaluationArrived { .. } => "EvaluationArrived",
            Self::EvaluationFailed { .. } => "EvaluationFailed",
            Self::Advance => "Advance",
            Self::WentBack => "WentBack",
            Self::SaveSucceeded => "SaveSucceeded",
            Self::SaveFailed { .. } => "SaveFailed",
            Self::RetrySave => "RetrySave",
        }
    }
}

/// Work the driver must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Record the answer in the session state and cache it.
    RecordAnswer { index: usize, answer: Answer },
    /// Ask the evaluator about question `index`; `skipped` selects the
    /// ideal-answer prompt over the feedback prompt.
    Dispatch { index: usize, skipped: bool },
    /// Record feedback (and score, if any) for question `index`.
    RecordFeedback {
        index: usize,
        feedback: String,
        score: Option<u8>,
    },
    /// Move the cursor to the next question.
    AdvanceCursor,
    /// Move the cursor to the previous question.
    RewindCursor,
    /// Persist the finished session.
    Save,
    /// Drop the cached in-flight session.
    ClearCache,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub next: EngineState,
    pub effects: Vec<Effect>,
}

impl Step {
    fn new(next: EngineState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }
}

/// Events the machine refuses in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TransitionError {
    #[error("an evaluation for question {index} is already in flight")]
    EvaluationInFlight { index: usize },
    #[error("session already completed")]
    SessionComplete,
    #[error("already at the first question")]
    AtFirstQuestion,
    #[error("session has not failed, nothing to retry")]
    NotFailed,
    #[error("event {event} does not apply in state {state}")]
    Unexpected {
        state: &'static str,
        event: &'static str,
    },
}

// ─── TRANSITIONS ───────────────────────────────────────────────────────────────

/// Applies `event` to `state`, producing the next state and the effects to
/// run. `last_index` is the index of the final question and decides whether
/// an advance moves on or triggers the save.
///
/// # Errors
///
/// Returns [`TransitionError`] when the event does not apply in the current
/// state. The state is unchanged in that case.
pub fn step(
    state: &EngineState,
    event: EngineEvent,
    last_index: usize,
) -> Result<Step, TransitionError> {
    match (state, event) {
        (EngineState::AwaitingAnswer { index }, EngineEvent::Submitted { answer }) => {
            let skipped = answer.is_skipped();
            Ok(Step::new(
                EngineState::Evaluating { index: *index },
                vec![
                    Effect::RecordAnswer {
                        index: *index,
                        answer,
                    },
                    Effect::Dispatch {
                        index: *index,
                        skipped,
                    },
                ],
            ))
        }
        (EngineState::AwaitingAnswer { index }, EngineEvent::WentBack) => {
            if *index == 0 {
                Err(TransitionError::AtFirstQuestion)
            } else {
                Ok(Step::new(
                    EngineState::AwaitingAnswer { index: index - 1 },
                    vec![Effect::RewindCursor],
                ))
            }
        }
        (EngineState::Evaluating { index }, EngineEvent::EvaluationArrived { feedback, score }) => {
            Ok(Step::new(
                EngineState::Advancing { index: *index },
                vec![Effect::RecordFeedback {
                    index: *index,
                    feedback,
                    score,
                }],
            ))
        }
        (EngineState::Evaluating { index }, EngineEvent::EvaluationFailed { reason }) => {
            Ok(Step::new(
                EngineState::Advancing { index: *index },
                vec![Effect::RecordFeedback {
                    index: *index,
                    feedback: unavailable_feedback(&reason),
                    score: None,
                }],
            ))
        }
        (EngineState::Evaluating { index }, EngineEvent::Submitted { .. }) => {
            Err(TransitionError::EvaluationInFlight { index: *index })
        }
        (EngineState::Advancing { index }, EngineEvent::Advance) => {
            if *index < last_index {
                Ok(Step::new(
                    EngineState::AwaitingAnswer { index: index + 1 },
                    vec![Effect::AdvanceCursor],
                ))
            } else {
                Ok(Step::new(
                    EngineState::Advancing { index: *index },
                    vec![Effect::Save],
                ))
            }
        }
        (EngineState::Advancing { .. }, EngineEvent::SaveSucceeded) => {
            Ok(Step::new(EngineState::Completed, vec![Effect::ClearCache]))
        }
        (EngineState::Advancing { index }, EngineEvent::SaveFailed { reason }) => Ok(Step::new(
            EngineState::Failed {
                index: *index,
                reason,
            },
            vec![],
        )),
        (EngineState::Failed { index, .. }, EngineEvent::RetrySave) => Ok(Step::new(
            EngineState::Advancing { index: *index },
            vec![Effect::Save],
        )),
        (EngineState::Completed, _) => Err(TransitionError::SessionComplete),
        (_, EngineEvent::RetrySave) => Err(TransitionError::NotFailed),
        (state, event) => Err(TransitionError::Unexpected {
            state: state.name(),
            event: event.name(),
        }),
    }
}

/// Feedback recorded when the evaluator could not be reached. The session
/// keeps the answer and moves on without a score.
#[must_use]
pub fn unavailable_feedback(reason: &str) -> String {
    format!(
        "Evaluation was unavailable for this answer ({reason}). \
         Your answer was kept and the session continued without a score."
    )
}

// ─── TESTS ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const LAST: usize = 2;

    fn awaiting(index: usize) -> EngineState {
        EngineState::AwaitingAnswer { index }
    }

    #[test]
    fn submitting_records_and_dispatches() {
        let step = step(
            &awaiting(0),
            EngineEvent::Submitted {
                answer: Answer::Provided("I led the migration".to_string()),
            },
            LAST,
        )
        .unwrap();

        assert_eq!(step.next, EngineState::Evaluating { index: 0 });
        assert_eq!(
            step.effects,
            vec![
                Effect::RecordAnswer {
                    index: 0,
                    answer: Answer::Provided("I led the migration".to_string()),
                },
                Effect::Dispatch {
                    index: 0,
                    skipped: false,
                },
            ]
        );
    }

    #[test]
    fn skipping_dispatches_the_ideal_answer_branch() {
        let step = step(
            &awaiting(1),
            EngineEvent::Submitted {
                answer: Answer::Skipped,
            },
            LAST,
        )
        .unwrap();

        assert_eq!(
            step.effects[1],
            Effect::Dispatch {
                index: 1,
                skipped: true,
            }
        );
    }

    #[test]
    fn evaluation_arrival_records_feedback() {
        let step = step(
            &EngineState::Evaluating { index: 1 },
            EngineEvent::EvaluationArrived {
                feedback: "Solid.\n\nScore: 8".to_string(),
                score: Some(8),
            },
            LAST,
        )
        .unwrap();

        assert_eq!(step.next, EngineState::Advancing { index: 1 });
        assert_eq!(
            step.effects,
            vec![Effect::RecordFeedback {
                index: 1,
                feedback: "Solid.\n\nScore: 8".to_string(),
                score: Some(8),
            }]
        );
    }

    #[test]
    fn evaluation_failure_is_absorbed_without_a_score() {
        let step = step(
            &EngineState::Evaluating { index: 1 },
            EngineEvent::EvaluationFailed {
                reason: "connection reset".to_string(),
            },
            LAST,
        )
        .unwrap();

        assert_eq!(step.next, EngineState::Advancing { index: 1 });
        let Effect::RecordFeedback {
            feedback, score, ..
        } = &step.effects[0]
        else {
            panic!("expected RecordFeedback, got {:?}", step.effects[0]);
        };
        assert!(feedback.contains("connection reset"));
        assert_eq!(*score, None);
    }

    #[test]
    fn advancing_moves_to_the_next_question() {
        let step = step(&EngineState::Advancing { index: 0 }, EngineEvent::Advance, LAST).unwrap();
        assert_eq!(step.next, awaiting(1));
        assert_eq!(step.effects, vec![Effect::AdvanceCursor]);
    }

    #[test]
    fn advancing_past_the_last_question_triggers_the_save() {
        let step =
            step(&EngineState::Advancing { index: LAST }, EngineEvent::Advance, LAST).unwrap();
        assert_eq!(step.next, EngineState::Advancing { index: LAST });
        assert_eq!(step.effects, vec![Effect::Save]);
    }

    #[test]
    fn save_success_completes_and_clears_the_cache() {
        let step = step(
            &EngineState::Advancing { index: LAST },
            EngineEvent::SaveSucceeded,
            LAST,
        )
        .unwrap();
        assert_eq!(step.next, EngineState::Completed);
        assert_eq!(step.effects, vec![Effect::ClearCache]);
    }

    #[test]
    fn save_failure_keeps_progress_and_enters_failed() {
        let step = step(
            &EngineState::Advancing { index: LAST },
            EngineEvent::SaveFailed {
                reason: "disk full".to_string(),
            },
            LAST,
        )
        .unwrap();
        assert_eq!(
            step.next,
            EngineState::Failed {
                index: LAST,
                reason: "disk full".to_string(),
            }
        );
        assert!(step.effects.is_empty());
    }

    #[test]
    fn retry_from_failed_saves_again() {
        let failed = EngineState::Failed {
            index: LAST,
            reason: "disk full".to_string(),
        };
        let step = step(&failed, EngineEvent::RetrySave, LAST).unwrap();
        assert_eq!(step.next, EngineState::Advancing { index: LAST });
        assert_eq!(step.effects, vec![Effect::Save]);
    }

    #[test]
    fn going_back_rewinds_the_cursor() {
        let step = step(&awaiting(2), EngineEvent::WentBack, LAST).unwrap();
        assert_eq!(step.next, awaiting(1));
        assert_eq!(step.effects, vec![Effect::RewindCursor]);
    }

    #[test]
    fn going_back_from_the_first_question_is_rejected() {
        let err = step(&awaiting(0), EngineEvent::WentBack, LAST).unwrap_err();
        assert_eq!(err, TransitionError::AtFirstQuestion);
    }

    #[test]
    fn submitting_during_evaluation_is_rejected() {
        let err = step(
            &EngineState::Evaluating { index: 1 },
            EngineEvent::Submitted {
                answer: Answer::Skipped,
            },
            LAST,
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::EvaluationInFlight { index: 1 });
    }

    #[test]
    fn completed_sessions_reject_everything() {
        let err = step(
            &EngineState::Completed,
            EngineEvent::Submitted {
                answer: Answer::Skipped,
            },
            LAST,
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::SessionComplete);

        let err = step(&EngineState::Completed, EngineEvent::RetrySave, LAST).unwrap_err();
        assert_eq!(err, TransitionError::SessionComplete);
    }

    #[test]
    fn retry_outside_failed_is_rejected() {
        let err = step(&awaiting(0), EngineEvent::RetrySave, LAST).unwrap_err();
        assert_eq!(err, TransitionError::NotFailed);
    }

    #[test]
    fn stray_events_are_rejected_by_name() {
        let err = step(&awaiting(0), EngineEvent::SaveSucceeded, LAST).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Unexpected {
                state: "AwaitingAnswer",
                event: "SaveSucceeded",
            }
        );
    }
}
