use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::model::challenge::Challenge;
use crate::model::ids::{ChallengeId, ProgressId};
use crate::progress;

/// Persisted progress for one calendar day of a challenge.
///
/// Logically keyed by (challenge, date); the store guarantees at most one
/// record per pair. `completed_rules` holds indices into the challenge's
/// original, unfiltered rule list as it stood at save time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyProgress {
    id: ProgressId,
    challenge_id: ChallengeId,
    date: NaiveDate,
    completed_rules: BTreeSet<usize>,
    is_complete: bool,
    notes: Option<String>,
}

impl DailyProgress {
    /// Rehydrate a progress record from persisted storage.
    #[must_use]
    pub fn from_persisted(
        id: ProgressId,
        challenge_id: ChallengeId,
        date: NaiveDate,
        completed_rules: BTreeSet<usize>,
        is_complete: bool,
        notes: Option<String>,
    ) -> Self {
        Self {
            id,
            challenge_id,
            date,
            completed_rules,
            is_complete,
            notes,
        }
    }

    #[must_use]
    pub fn id(&self) -> ProgressId {
        self.id
    }

    #[must_use]
    pub fn challenge_id(&self) -> ChallengeId {
        self.challenge_id
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn completed_rules(&self) -> &BTreeSet<usize> {
        &self.completed_rules
    }

    /// The completion flag as it was written at save time.
    ///
    /// Derivations recompute completion from `completed_rules` instead of
    /// trusting this flag; it exists so list views can render without the
    /// challenge at hand.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

/// The canonical record an edit session hands to the store.
///
/// Carries no id: insert-vs-update is decided by the caller passing the
/// previously loaded record id (or not) alongside the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressDraft {
    pub challenge_id: ChallengeId,
    pub date: NaiveDate,
    pub completed_rules: Vec<usize>,
    pub is_complete: bool,
    pub notes: Option<String>,
}

impl ProgressDraft {
    /// Build the canonical record for one day's edits.
    ///
    /// Indices come out sorted, completion is recomputed against the
    /// challenge's active rules, and notes are trimmed (empty becomes
    /// `None`).
    #[must_use]
    pub fn new(
        challenge: &Challenge,
        date: NaiveDate,
        completed: &BTreeSet<usize>,
        notes: &str,
    ) -> Self {
        let trimmed = notes.trim();
        Self {
            challenge_id: challenge.id(),
            date,
            completed_rules: completed.iter().copied().collect(),
            is_complete: progress::is_rule_set_complete(challenge, completed),
            notes: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }
}
