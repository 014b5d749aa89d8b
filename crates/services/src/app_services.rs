use std::sync::Arc;

use challenge_core::model::Challenge;
use storage::repository::Storage;

use crate::Clock;
use crate::challenge_service::ChallengeService;
use crate::daily_edit::DailyEditSession;
use crate::error::AppServicesError;

/// Assembles app-facing services over a shared storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    challenge_service: Arc<ChallengeService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock))
    }

    /// Build services over the in-memory backend, for tests and prototyping.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    fn from_storage(storage: Storage, clock: Clock) -> Self {
        let challenge_service = Arc::new(ChallengeService::new(
            clock,
            Arc::clone(&storage.challenges),
            Arc::clone(&storage.progress),
        ));
        Self {
            clock,
            storage,
            challenge_service,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn challenge_service(&self) -> Arc<ChallengeService> {
        Arc::clone(&self.challenge_service)
    }

    /// Start an edit session sharing this app's progress store.
    #[must_use]
    pub fn edit_session(&self, challenge: Challenge) -> DailyEditSession {
        self.challenge_service.edit_session(challenge)
    }
}
