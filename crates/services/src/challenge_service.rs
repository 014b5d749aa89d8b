use std::sync::Arc;

use challenge_core::model::{Challenge, ChallengeId, UserId};
use challenge_core::progress::{
    CalendarDay, ChallengeStats, aggregate_stats, calendar_grid, current_day_number,
};
use challenge_core::time::Clock;
use storage::repository::{ChallengeRepository, ProgressRepository};

use crate::daily_edit::DailyEditSession;
use crate::error::ChallengeServiceError;

/// Everything a challenge page renders: the challenge itself, the current
/// day number, the 75-cell calendar, and the header stats.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeOverview {
    pub challenge: Challenge,
    pub current_day: u32,
    pub calendar: Vec<CalendarDay>,
    pub stats: ChallengeStats,
}

/// Read-side derivations: loads a challenge and its history, then runs the
/// pure calculator against the clock's current date.
pub struct ChallengeService {
    clock: Clock,
    challenges: Arc<dyn ChallengeRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ChallengeService {
    #[must_use]
    pub fn new(
        clock: Clock,
        challenges: Arc<dyn ChallengeRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            challenges,
            progress,
        }
    }

    /// Build the overview for one challenge, checked against the owning user.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeServiceError::NotFound` if the challenge is absent
    /// (or owned by someone else); propagates storage failures.
    pub async fn overview(
        &self,
        id: ChallengeId,
        user_id: UserId,
    ) -> Result<ChallengeOverview, ChallengeServiceError> {
        let challenge = self
            .challenges
            .get_challenge(id, user_id)
            .await?
            .ok_or(ChallengeServiceError::NotFound)?;
        self.build_overview(challenge).await
    }

    /// Build the overview for the user's active challenge, if any.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn active_overview(
        &self,
        user_id: UserId,
    ) -> Result<Option<ChallengeOverview>, ChallengeServiceError> {
        match self.challenges.active_challenge(user_id).await? {
            Some(challenge) => Ok(Some(self.build_overview(challenge).await?)),
            None => Ok(None),
        }
    }

    async fn build_overview(
        &self,
        challenge: Challenge,
    ) -> Result<ChallengeOverview, ChallengeServiceError> {
        let history = self.progress.progress_history(challenge.id()).await?;
        let today = self.clock.today();

        Ok(ChallengeOverview {
            current_day: current_day_number(&challenge, today),
            calendar: calendar_grid(&challenge, &history, today),
            stats: aggregate_stats(&challenge, &history, today),
            challenge,
        })
    }

    /// Start an edit session for one of this user's challenges, sharing the
    /// service's progress store.
    #[must_use]
    pub fn edit_session(&self, challenge: Challenge) -> DailyEditSession {
        DailyEditSession::new(challenge, Arc::clone(&self.progress))
    }
}
