use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ChallengeId, UserId};

/// A challenge always spans exactly this many calendar days.
pub const CHALLENGE_DAYS: u32 = 75;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChallengeError {
    #[error("end_date {end} is inconsistent with a 75-day span from {start}")]
    InvalidSpan { start: NaiveDate, end: NaiveDate },

    #[error("unknown challenge tier: {0}")]
    UnknownTier(String),
}

//
// ─── TIER ──────────────────────────────────────────────────────────────────────
//

/// Difficulty tier chosen when the challenge is started.
///
/// Informational only: the progress math is identical across tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeTier {
    Soft,
    Medium,
    Hard,
}

impl ChallengeTier {
    /// Storage representation of the tier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeTier::Soft => "soft",
            ChallengeTier::Medium => "medium",
            ChallengeTier::Hard => "hard",
        }
    }
}

impl fmt::Display for ChallengeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeTier {
    type Err = ChallengeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "soft" => Ok(ChallengeTier::Soft),
            "medium" => Ok(ChallengeTier::Medium),
            "hard" => Ok(ChallengeTier::Hard),
            other => Err(ChallengeError::UnknownTier(other.to_string())),
        }
    }
}

//
// ─── CHALLENGE ─────────────────────────────────────────────────────────────────
//

/// A 75-day habit program with a fixed daily rule checklist.
///
/// Rules are stored exactly as the user entered them, blanks included.
/// Blank (whitespace-only) entries are inert: progress records address rules
/// by position in this original list, so inert entries keep their slots but
/// are excluded from every completion calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    id: ChallengeId,
    user_id: UserId,
    tier: ChallengeTier,
    start_date: NaiveDate,
    end_date: NaiveDate,
    rules: Vec<String>,
    is_active: bool,
}

impl Challenge {
    /// Creates a new challenge starting on `start_date`.
    ///
    /// The end date is derived: day 1 is `start_date`, day 75 is
    /// `start_date + 74` days.
    #[must_use]
    pub fn new(
        id: ChallengeId,
        user_id: UserId,
        tier: ChallengeTier,
        start_date: NaiveDate,
        rules: Vec<String>,
        is_active: bool,
    ) -> Self {
        let end_date = start_date + Duration::days(i64::from(CHALLENGE_DAYS) - 1);
        Self {
            id,
            user_id,
            tier,
            start_date,
            end_date,
            rules,
            is_active,
        }
    }

    /// Rehydrate a challenge from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::InvalidSpan` if the stored `end_date` does not
    /// sit exactly 74 days after `start_date`.
    pub fn from_persisted(
        id: ChallengeId,
        user_id: UserId,
        tier: ChallengeTier,
        start_date: NaiveDate,
        end_date: NaiveDate,
        rules: Vec<String>,
        is_active: bool,
    ) -> Result<Self, ChallengeError> {
        let expected = start_date + Duration::days(i64::from(CHALLENGE_DAYS) - 1);
        if end_date != expected {
            return Err(ChallengeError::InvalidSpan {
                start: start_date,
                end: end_date,
            });
        }

        Ok(Self {
            id,
            user_id,
            tier,
            start_date,
            end_date,
            rules,
            is_active,
        })
    }

    #[must_use]
    pub fn id(&self) -> ChallengeId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn tier(&self) -> ChallengeTier {
        self.tier
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    #[must_use]
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Replace the rule list.
    ///
    /// Historical progress records keep their original index positions, so a
    /// rule edit after progress exists can desynchronize the completion
    /// display of old days. The tracker accepts this in exchange for a stable
    /// on-disk format.
    pub fn set_rules(&mut self, rules: Vec<String>) {
        self.rules = rules;
    }

    /// Mark the challenge active or inactive.
    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
