mod answer;
mod ids;
mod meta;
mod session;

pub use answer::Answer;
pub use ids::{ParseIdError, SessionId, UserId};
pub use meta::InterviewMeta;

pub use session::{MAX_QUESTIONS, SessionError, SessionRecord, SessionState};
