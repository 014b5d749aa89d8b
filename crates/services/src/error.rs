//! Shared error types for the services crate.

use thiserror::Error;

use challenge_core::model::ChallengeError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `DailyEditSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EditSessionError {
    #[error("no date selected")]
    NoDateSelected,

    #[error("rule index {index} out of bounds for {len} rules")]
    InvalidRuleIndex { index: usize, len: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ChallengeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChallengeServiceError {
    /// The challenge itself is missing. Distinct from a day with no
    /// progress, which is an expected state, not an error.
    #[error("challenge not found")]
    NotFound,

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
