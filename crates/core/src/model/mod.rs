mod challenge;
mod daily_progress;
mod ids;

pub use challenge::{CHALLENGE_DAYS, Challenge, ChallengeError, ChallengeTier};
pub use daily_progress::{DailyProgress, ProgressDraft};
pub use ids::{ChallengeId, ParseIdError, ProgressId, UserId};
