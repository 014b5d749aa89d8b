use challenge_core::model::{Challenge, ChallengeId, UserId};

use super::{SqliteRepository, mapping};
use crate::repository::{ChallengeRepository, StorageError};

#[async_trait::async_trait]
impl ChallengeRepository for SqliteRepository {
    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // The store owns "at most one active challenge per user": writing an
        // active row deactivates the user's other rows in the same
        // transaction.
        if challenge.is_active() {
            sqlx::query(
                r"
                UPDATE challenges
                SET is_active = 0
                WHERE user_id = ?1 AND id <> ?2
                ",
            )
            .bind(challenge.user_id().to_string())
            .bind(challenge.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        sqlx::query(
            r"
            INSERT INTO challenges (
                id, user_id, tier, start_date, end_date, rules, is_active
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                -- keep id and user_id from the original insert
                tier = excluded.tier,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                rules = excluded.rules,
                is_active = excluded.is_active
            ",
        )
        .bind(challenge.id().to_string())
        .bind(challenge.user_id().to_string())
        .bind(challenge.tier().as_str())
        .bind(challenge.start_date())
        .bind(challenge.end_date())
        .bind(mapping::rules_to_json(challenge.rules())?)
        .bind(challenge.is_active())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_challenge(
        &self,
        id: ChallengeId,
        user_id: UserId,
    ) -> Result<Option<Challenge>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, tier, start_date, end_date, rules, is_active
            FROM challenges
            WHERE id = ?1 AND user_id = ?2
            ",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_challenge_row(&r)).transpose()
    }

    async fn active_challenge(&self, user_id: UserId) -> Result<Option<Challenge>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, tier, start_date, end_date, rules, is_active
            FROM challenges
            WHERE user_id = ?1 AND is_active = 1
            LIMIT 1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_challenge_row(&r)).transpose()
    }
}
