//! The learning loop exposed to callers.
//!
//! A [`LearningSession`] owns the store, the solver, both labelers, the training trigger and
//! the model selection state. Callers either drive it step by step
//! ([`solve_and_record`](LearningSession::solve_and_record) then
//! [`record_outcome`](LearningSession::record_outcome)) or hand it a [`ChallengeDriver`].

mod driver;
pub mod error;
mod learning;
mod types;


pub use driver::ChallengeDriver;
pub use error::{SessionError, SessionResult};
pub use learning::LearningSession;
pub use types::{
    ChallengeOutcome, LearningStatus, RecordedOutcome, SessionConfig, SolveTicket,
};
