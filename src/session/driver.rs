use crate::challenge::{CandidateIndex, Challenge};

/// The application that shows challenges and judges answers.
///
/// Implementations own all rendering and clicking; the session only sees questions,
/// images and a pass/fail verdict.
pub trait ChallengeDriver {
    /// Rendering or submission failure; surfaced as [`SessionError::Driver`](super::SessionError::Driver).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the challenge currently on screen.
    fn render_challenge(&mut self) -> Result<Challenge, Self::Error>;

    /// Submits `index`; returns whether the application accepted it.
    fn submit_choice(&mut self, index: CandidateIndex) -> Result<bool, Self::Error>;
}
