#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod score;
pub mod time;

pub use error::Error;
pub use score::extract_score;
pub use time::Clock;
