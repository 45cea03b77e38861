use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{Answer, InterviewMeta, UserId};

/// Upper bound on questions per session. Longer lists are truncated at
/// creation, never rejected.
pub const MAX_QUESTIONS: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("a session needs at least one question")]
    NoQuestions,

    #[error("index {index} out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("question {index} was skipped and cannot carry a score")]
    ScoreForSkipped { index: usize },

    #[error("session incomplete: {answered} of {total} questions answered")]
    Incomplete { answered: usize, total: usize },

    #[error("session state is corrupt: {0}")]
    CorruptState(String),
}

/// In-progress interview state: the questions being asked and everything
/// the user and the evaluator have produced so far.
///
/// Answers, feedbacks and scores are keyed by question index. A question
/// can hold an answer without feedback while its evaluation is in flight;
/// a score only ever exists for a non-skipped, answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    questions: Vec<String>,
    answers: BTreeMap<usize, Answer>,
    feedbacks: BTreeMap<usize, String>,
    scores: BTreeMap<usize, u8>,
    current_index: usize,
}

impl SessionState {
    /// Starts a fresh session over the given questions.
    ///
    /// Question lists longer than [`MAX_QUESTIONS`] are truncated.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestions` for an empty list.
    pub fn new(mut questions: Vec<String>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        questions.truncate(MAX_QUESTIONS);
        Ok(Self {
            questions,
            answers: BTreeMap::new(),
            feedbacks: BTreeMap::new(),
            scores: BTreeMap::new(),
            current_index: 0,
        })
    }

    /// Rehydrates a session from cached progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestions` for an empty question list, and
    /// `SessionError::CorruptState` when the parts violate the session
    /// invariants: an index out of range, a score without a matching
    /// answer, or a score attached to a skipped question.
    pub fn from_parts(
        questions: Vec<String>,
        answers: BTreeMap<usize, Answer>,
        feedbacks: BTreeMap<usize, String>,
        scores: BTreeMap<usize, u8>,
        current_index: usize,
    ) -> Result<Self, SessionError> {
        let mut state = Self::new(questions)?;
        let len = state.questions.len();

        if current_index >= len {
            return Err(SessionError::CorruptState(format!(
                "current index {current_index} out of range for {len} questions"
            )));
        }
        if let Some(&index) = answers.keys().find(|&&index| index >= len) {
            return Err(SessionError::CorruptState(format!(
                "answer index {index} out of range for {len} questions"
            )));
        }
        if let Some(&index) = feedbacks.keys().find(|&&index| index >= len) {
            return Err(SessionError::CorruptState(format!(
                "feedback index {index} out of range for {len} questions"
            )));
        }
        for &index in scores.keys() {
            match answers.get(&index) {
                Some(Answer::Provided(_)) => {}
                Some(Answer::Skipped) => {
                    return Err(SessionError::CorruptState(format!(
                        "score recorded for skipped question {index}"
                    )));
                }
                None => {
                    return Err(SessionError::CorruptState(format!(
                        "score recorded for unanswered question {index}"
                    )));
                }
            }
        }

        state.answers = answers;
        state.feedbacks = feedbacks;
        state.scores = scores;
        state.current_index = current_index;
        Ok(state)
    }

    /// Records the user's answer at `index`, overwriting any earlier one.
    ///
    /// Recording a skip removes any score previously earned at that index,
    /// so revisiting and skipping a question never leaves a stale score.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange` for an index past the end
    /// of the question list.
    pub fn record_answer(&mut self, index: usize, answer: Answer) -> Result<(), SessionError> {
        self.check_index(index)?;
        if answer.is_skipped() {
            self.scores.remove(&index);
        }
        self.answers.insert(index, answer);
        Ok(())
    }

    /// Records evaluator output at `index`.
    ///
    /// Feedback always overwrites. `Some(score)` inserts a score clamped
    /// to 0..=10; `None` leaves existing scores untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange` for a bad index and
    /// `SessionError::ScoreForSkipped` when a score arrives for a question
    /// the user skipped.
    pub fn record_evaluation(
        &mut self,
        index: usize,
        feedback: impl Into<String>,
        score: Option<u8>,
    ) -> Result<(), SessionError> {
        self.check_index(index)?;
        if let Some(score) = score {
            if matches!(self.answers.get(&index), Some(Answer::Skipped)) {
                return Err(SessionError::ScoreForSkipped { index });
            }
            self.scores.insert(index, score.min(10));
        }
        self.feedbacks.insert(index, feedback.into());
        Ok(())
    }

    /// Moves the cursor to the next question, capped at the last index.
    /// Returns the new position.
    pub fn advance(&mut self) -> usize {
        self.current_index = (self.current_index + 1).min(self.last_index());
        self.current_index
    }

    /// Steps the cursor back one question, floored at zero. Returns the
    /// new position.
    pub fn retreat(&mut self) -> usize {
        self.current_index = self.current_index.saturating_sub(1);
        self.current_index
    }

    fn check_index(&self, index: usize) -> Result<(), SessionError> {
        if index >= self.questions.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&str> {
        self.questions.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&Answer> {
        self.answers.get(&index)
    }

    #[must_use]
    pub fn feedback(&self, index: usize) -> Option<&str> {
        self.feedbacks.get(&index).map(String::as_str)
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, Answer> {
        &self.answers
    }

    #[must_use]
    pub fn feedbacks(&self) -> &BTreeMap<usize, String> {
        &self.feedbacks
    }

    #[must_use]
    pub fn scores(&self) -> &BTreeMap<usize, u8> {
        &self.scores
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Index of the final question. Always valid: a session has at least
    /// one question.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.questions.len() - 1
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Whether every question has an answer (provided or skipped).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.answers.len() == self.questions.len()
    }

    /// Mean of the recorded scores. Skipped and unevaluated questions are
    /// excluded from both numerator and denominator; no scores at all
    /// yields 0.0.
    #[must_use]
    pub fn average_score(&self) -> f64 {
        mean(self.scores.values().copied())
    }
}

/// A finished session in its persistable shape.
///
/// Only complete sessions are ever persisted; building a record from an
/// unfinished [`SessionState`] is an error, not a truncation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    user_id: UserId,
    questions: Vec<String>,
    answers: Vec<Answer>,
    feedbacks: Vec<String>,
    scores: BTreeMap<usize, u8>,
    meta: InterviewMeta,
    created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Builds the persistable record for a finished session.
    ///
    /// `created_at` is assigned here, at persist time, not when the
    /// session started.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Incomplete` while any question is still
    /// unanswered.
    pub fn from_state(
        user_id: UserId,
        meta: InterviewMeta,
        state: &SessionState,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let total = state.question_count();
        let mut answers = Vec::with_capacity(total);
        let mut feedbacks = Vec::with_capacity(total);
        for index in 0..total {
            let Some(answer) = state.answer(index) else {
                return Err(SessionError::Incomplete {
                    answered: state.answered_count(),
                    total,
                });
            };
            answers.push(answer.clone());
            feedbacks.push(state.feedback(index).unwrap_or_default().to_string());
        }

        Ok(Self {
            user_id,
            questions: state.questions.clone(),
            answers,
            feedbacks,
            scores: state.scores.clone(),
            meta,
            created_at,
        })
    }

    /// Rehydrates a record from persisted storage.
    ///
    /// Score values are clamped to 0..=10.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestions` for an empty question list and
    /// `SessionError::CorruptState` when the columns do not line up: the
    /// answer or feedback list differs in length from the questions, or a
    /// score points at a skipped or missing answer.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        questions: Vec<String>,
        answers: Vec<Answer>,
        feedbacks: Vec<String>,
        scores: BTreeMap<usize, u8>,
        meta: InterviewMeta,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        if answers.len() != questions.len() {
            return Err(SessionError::CorruptState(format!(
                "{} answers for {} questions",
                answers.len(),
                questions.len()
            )));
        }
        if feedbacks.len() != questions.len() {
            return Err(SessionError::CorruptState(format!(
                "{} feedbacks for {} questions",
                feedbacks.len(),
                questions.len()
            )));
        }
        for &index in scores.keys() {
            match answers.get(index) {
                Some(Answer::Provided(_)) => {}
                Some(Answer::Skipped) => {
                    return Err(SessionError::CorruptState(format!(
                        "score recorded for skipped question {index}"
                    )));
                }
                None => {
                    return Err(SessionError::CorruptState(format!(
                        "score index {index} out of range for {} questions",
                        questions.len()
                    )));
                }
            }
        }
        let scores = scores
            .into_iter()
            .map(|(index, score)| (index, score.min(10)))
            .collect();

        Ok(Self {
            user_id,
            questions,
            answers,
            feedbacks,
            scores,
            meta,
            created_at,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn feedbacks(&self) -> &[String] {
        &self.feedbacks
    }

    #[must_use]
    pub fn scores(&self) -> &BTreeMap<usize, u8> {
        &self.scores
    }

    #[must_use]
    pub fn meta(&self) -> &InterviewMeta {
        &self.meta
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Mean of this session's scores, 0.0 when no question was scored.
    #[must_use]
    pub fn average_score(&self) -> f64 {
        mean(self.scores.values().copied())
    }
}

fn mean(values: impl Iterator<Item = u8>) -> f64 {
    let mut sum = 0_u32;
    let mut count = 0_u32;
    for value in values {
        sum += u32::from(value);
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        f64::from(sum) / f64::from(count)
    }
}
