use std::collections::BTreeSet;

use challenge_core::model::{
    Challenge, ChallengeId, ChallengeTier, DailyProgress, ProgressId, UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn challenge_id_from_text(s: &str) -> Result<ChallengeId, StorageError> {
    s.parse::<ChallengeId>().map_err(ser)
}

pub(crate) fn user_id_from_text(s: &str) -> Result<UserId, StorageError> {
    s.parse::<UserId>().map_err(ser)
}

pub(crate) fn progress_id_from_text(s: &str) -> Result<ProgressId, StorageError> {
    s.parse::<ProgressId>().map_err(ser)
}

/// Rule lists and completed-rule sets are stored as JSON text columns.
pub(crate) fn rules_to_json(rules: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(rules).map_err(ser)
}

pub(crate) fn indices_to_json(indices: &[usize]) -> Result<String, StorageError> {
    serde_json::to_string(indices).map_err(ser)
}

pub(crate) fn map_challenge_row(row: &sqlx::sqlite::SqliteRow) -> Result<Challenge, StorageError> {
    let id = challenge_id_from_text(row.try_get::<String, _>("id").map_err(ser)?.as_str())?;
    let user_id = user_id_from_text(row.try_get::<String, _>("user_id").map_err(ser)?.as_str())?;

    let tier: ChallengeTier = row
        .try_get::<String, _>("tier")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let rules: Vec<String> =
        serde_json::from_str(row.try_get::<String, _>("rules").map_err(ser)?.as_str())
            .map_err(ser)?;

    Challenge::from_persisted(
        id,
        user_id,
        tier,
        row.try_get("start_date").map_err(ser)?,
        row.try_get("end_date").map_err(ser)?,
        rules,
        row.try_get("is_active").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<DailyProgress, StorageError> {
    let id = progress_id_from_text(row.try_get::<String, _>("id").map_err(ser)?.as_str())?;
    let challenge_id = challenge_id_from_text(
        row.try_get::<String, _>("challenge_id")
            .map_err(ser)?
            .as_str(),
    )?;

    let completed_rules: BTreeSet<usize> = serde_json::from_str(
        row.try_get::<String, _>("completed_rules")
            .map_err(ser)?
            .as_str(),
    )
    .map_err(ser)?;

    Ok(DailyProgress::from_persisted(
        id,
        challenge_id,
        row.try_get("date").map_err(ser)?,
        completed_rules,
        row.try_get("is_complete").map_err(ser)?,
        row.try_get("notes").map_err(ser)?,
    ))
}
