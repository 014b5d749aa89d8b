use challenge_core::model::{ChallengeId, DailyProgress, ProgressDraft, ProgressId};
use chrono::NaiveDate;

use super::{SqliteRepository, mapping};
use crate::repository::{ProgressRepository, StorageError};

fn connection_or_conflict(e: sqlx::Error) -> StorageError {
    if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_daily_progress(
        &self,
        challenge_id: ChallengeId,
        date: NaiveDate,
    ) -> Result<Option<DailyProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, challenge_id, date, completed_rules, is_complete, notes
            FROM daily_progress
            WHERE challenge_id = ?1 AND date = ?2
            ",
        )
        .bind(challenge_id.to_string())
        .bind(date)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_progress_row(&r)).transpose()
    }

    async fn progress_history(
        &self,
        challenge_id: ChallengeId,
    ) -> Result<Vec<DailyProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, challenge_id, date, completed_rules, is_complete, notes
            FROM daily_progress
            WHERE challenge_id = ?1
            ORDER BY date ASC
            ",
        )
        .bind(challenge_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(mapping::map_progress_row(&row)?);
        }
        Ok(records)
    }

    async fn save_daily_progress(
        &self,
        draft: &ProgressDraft,
        existing: Option<ProgressId>,
    ) -> Result<DailyProgress, StorageError> {
        let completed = mapping::indices_to_json(&draft.completed_rules)?;

        let id = match existing {
            Some(id) => {
                let result = sqlx::query(
                    r"
                    UPDATE daily_progress
                    SET completed_rules = ?1, is_complete = ?2, notes = ?3
                    WHERE id = ?4
                    ",
                )
                .bind(&completed)
                .bind(draft.is_complete)
                .bind(draft.notes.as_deref())
                .bind(id.to_string())
                .execute(self.pool())
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

                if result.rows_affected() == 0 {
                    return Err(StorageError::NotFound);
                }
                id
            }
            None => {
                let id = ProgressId::random();
                sqlx::query(
                    r"
                    INSERT INTO daily_progress (
                        id, challenge_id, date, completed_rules, is_complete, notes
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(id.to_string())
                .bind(draft.challenge_id.to_string())
                .bind(draft.date)
                .bind(&completed)
                .bind(draft.is_complete)
                .bind(draft.notes.as_deref())
                .execute(self.pool())
                .await
                .map_err(connection_or_conflict)?;
                id
            }
        };

        Ok(DailyProgress::from_persisted(
            id,
            draft.challenge_id,
            draft.date,
            draft.completed_rules.iter().copied().collect(),
            draft.is_complete,
            draft.notes.clone(),
        ))
    }
}
