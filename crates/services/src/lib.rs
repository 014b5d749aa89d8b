#![forbid(unsafe_code)]

pub mod app_services;
pub mod challenge_service;
pub mod daily_edit;
pub mod error;

pub use challenge_core::Clock;

pub use app_services::AppServices;
pub use challenge_service::{ChallengeOverview, ChallengeService};
pub use daily_edit::{DailyEditSession, SaveOutcome};
pub use error::{AppServicesError, ChallengeServiceError, EditSessionError};
