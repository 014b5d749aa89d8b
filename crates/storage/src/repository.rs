use async_trait::async_trait;
use challenge_core::model::{
    Challenge, ChallengeId, DailyProgress, ProgressDraft, ProgressId, UserId,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
///
/// A missing progress record is not an error: reads return `Ok(None)` and
/// the caller treats it as "no progress yet". `NotFound` is reserved for
/// updates against a record id that no longer exists.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for challenges.
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    /// Persist or update a challenge.
    ///
    /// Writing an active challenge deactivates the user's other challenges;
    /// the store owns the "at most one active per user" rule.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the challenge cannot be stored.
    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError>;

    /// Fetch a challenge by id, checked against the owning user.
    ///
    /// A challenge owned by a different user reads as absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_challenge(
        &self,
        id: ChallengeId,
        user_id: UserId,
    ) -> Result<Option<Challenge>, StorageError>;

    /// Fetch the user's active challenge, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn active_challenge(&self, user_id: UserId) -> Result<Option<Challenge>, StorageError>;
}

/// Repository contract for daily progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the progress record for one (challenge, date) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; absence is `Ok(None)`.
    async fn get_daily_progress(
        &self,
        challenge_id: ChallengeId,
        date: NaiveDate,
    ) -> Result<Option<DailyProgress>, StorageError>;

    /// Fetch all progress records for a challenge, date-ascending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn progress_history(
        &self,
        challenge_id: ChallengeId,
    ) -> Result<Vec<DailyProgress>, StorageError>;

    /// Persist a day's progress.
    ///
    /// Inserts when `existing` is `None` (the store assigns a fresh id;
    /// a second record for the same (challenge, date) is a `Conflict`),
    /// updates the record keyed by `existing` otherwise. The branch is
    /// decided by id presence alone; there is no separate existence check
    /// to race against.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when updating a vanished id,
    /// `StorageError::Conflict` on a duplicate insert, or other storage
    /// errors.
    async fn save_daily_progress(
        &self,
        draft: &ProgressDraft,
        existing: Option<ProgressId>,
    ) -> Result<DailyProgress, StorageError>;
}

fn progress_from_draft(draft: &ProgressDraft, id: ProgressId) -> DailyProgress {
    DailyProgress::from_persisted(
        id,
        draft.challenge_id,
        draft.date,
        draft.completed_rules.iter().copied().collect(),
        draft.is_complete,
        draft.notes.clone(),
    )
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    challenges: Arc<Mutex<HashMap<ChallengeId, Challenge>>>,
    progress: Arc<Mutex<HashMap<ProgressId, DailyProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            challenges: Arc::new(Mutex::new(HashMap::new())),
            progress: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ChallengeRepository for InMemoryRepository {
    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        let mut guard = self
            .challenges
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if challenge.is_active() {
            for other in guard.values_mut() {
                if other.user_id() == challenge.user_id() && other.id() != challenge.id() {
                    other.set_active(false);
                }
            }
        }
        guard.insert(challenge.id(), challenge.clone());
        Ok(())
    }

    async fn get_challenge(
        &self,
        id: ChallengeId,
        user_id: UserId,
    ) -> Result<Option<Challenge>, StorageError> {
        let guard = self
            .challenges
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .get(&id)
            .filter(|c| c.user_id() == user_id)
            .cloned())
    }

    async fn active_challenge(&self, user_id: UserId) -> Result<Option<Challenge>, StorageError> {
        let guard = self
            .challenges
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .find(|c| c.user_id() == user_id && c.is_active())
            .cloned())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_daily_progress(
        &self,
        challenge_id: ChallengeId,
        date: NaiveDate,
    ) -> Result<Option<DailyProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .find(|p| p.challenge_id() == challenge_id && p.date() == date)
            .cloned())
    }

    async fn progress_history(
        &self,
        challenge_id: ChallengeId,
    ) -> Result<Vec<DailyProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<DailyProgress> = guard
            .values()
            .filter(|p| p.challenge_id() == challenge_id)
            .cloned()
            .collect();
        records.sort_by_key(DailyProgress::date);
        Ok(records)
    }

    async fn save_daily_progress(
        &self,
        draft: &ProgressDraft,
        existing: Option<ProgressId>,
    ) -> Result<DailyProgress, StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match existing {
            Some(id) => {
                if !guard.contains_key(&id) {
                    return Err(StorageError::NotFound);
                }
                let record = progress_from_draft(draft, id);
                guard.insert(id, record.clone());
                Ok(record)
            }
            None => {
                let duplicate = guard
                    .values()
                    .any(|p| p.challenge_id() == draft.challenge_id && p.date() == draft.date);
                if duplicate {
                    return Err(StorageError::Conflict);
                }
                let record = progress_from_draft(draft, ProgressId::random());
                guard.insert(record.id(), record.clone());
                Ok(record)
            }
        }
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub challenges: Arc<dyn ChallengeRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let challenges: Arc<dyn ChallengeRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            challenges,
            progress,
        }
    }
}
