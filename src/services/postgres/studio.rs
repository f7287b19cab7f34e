use uuid::Uuid;

use super::{PostgresClient, PostgresError};
use crate::core::VoiceProfileStatus;
use crate::models::{Purchase, Sample, SampleKind, VoiceProfile};

impl PostgresClient {
    pub async fn insert_sample(
        &self,
        user_id: Uuid,
        kind: SampleKind,
        title: &str,
        content: &str,
        word_count: i64,
        source_file_id: Option<&str>,
    ) -> Result<Sample, PostgresError> {
        let query = r#"
            INSERT INTO samples (id, user_id, kind, title, content, word_count, source_file_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING *
        "#;

        let sample = sqlx::query_as::<_, Sample>(query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(kind)
            .bind(title)
            .bind(content)
            .bind(word_count)
            .bind(source_file_id)
            .fetch_one(self.pool())
            .await?;

        Ok(sample)
    }

    pub async fn list_samples(&self, user_id: Uuid) -> Result<Vec<Sample>, PostgresError> {
        let samples = sqlx::query_as::<_, Sample>(
            "SELECT * FROM samples WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(samples)
    }

    pub async fn count_samples(&self, user_id: Uuid) -> Result<i64, PostgresError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM samples WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;

        Ok(count.0)
    }

    pub async fn total_sample_words(&self, user_id: Uuid) -> Result<i64, PostgresError> {
        let total: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(word_count), 0) FROM samples WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok(total.0)
    }

    /// Delete a sample; returns the storage path of the source audio, if any,
    /// so the caller can clean up object storage.
    pub async fn delete_sample(
        &self,
        user_id: Uuid,
        sample_id: Uuid,
    ) -> Result<Option<String>, PostgresError> {
        let deleted: Option<(Option<String>,)> = sqlx::query_as(
            "DELETE FROM samples WHERE id = $1 AND user_id = $2 RETURNING source_file_id",
        )
        .bind(sample_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        match deleted {
            Some((source_file_id,)) => Ok(source_file_id),
            None => Err(PostgresError::NotFound(format!("Sample not found: {}", sample_id))),
        }
    }

    /// Insert a voice profile row already in `processing`, numbered after the
    /// user's latest version
    pub async fn insert_voice_profile(
        &self,
        user_id: Uuid,
        purchase_id: Uuid,
        model: &str,
    ) -> Result<VoiceProfile, PostgresError> {
        let query = r#"
            INSERT INTO voice_profiles (id, user_id, status, version, model, purchase_id, created_at, updated_at)
            VALUES (
                $1, $2, 'processing',
                COALESCE((SELECT MAX(version) FROM voice_profiles WHERE user_id = $2), 0) + 1,
                $3, $4, NOW(), NOW()
            )
            RETURNING *
        "#;

        let profile = sqlx::query_as::<_, VoiceProfile>(query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(model)
            .bind(purchase_id)
            .fetch_one(self.pool())
            .await?;

        Ok(profile)
    }

    pub async fn mark_voice_profile_ready(
        &self,
        id: Uuid,
        style_summary: &str,
        system_prompt: &str,
        artifact_path: &str,
    ) -> Result<VoiceProfile, PostgresError> {
        let query = r#"
            UPDATE voice_profiles
            SET status = 'ready',
                style_summary = $2,
                system_prompt = $3,
                artifact_path = $4,
                error = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            RETURNING *
        "#;

        sqlx::query_as::<_, VoiceProfile>(query)
            .bind(id)
            .bind(style_summary)
            .bind(system_prompt)
            .bind(artifact_path)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("Processing profile not found: {}", id)))
    }

    pub async fn mark_voice_profile_failed(
        &self,
        id: Uuid,
        error: &str,
    ) -> Result<(), PostgresError> {
        sqlx::query(
            r#"
            UPDATE voice_profiles
            SET status = 'failed', error = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn list_voice_profiles(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<VoiceProfile>, PostgresError> {
        let profiles = sqlx::query_as::<_, VoiceProfile>(
            "SELECT * FROM voice_profiles WHERE user_id = $1 ORDER BY version DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(profiles)
    }

    pub async fn get_voice_profile(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<VoiceProfile>, PostgresError> {
        let profile = sqlx::query_as::<_, VoiceProfile>(
            "SELECT * FROM voice_profiles WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(profile)
    }

    pub async fn count_voice_profiles_with_status(
        &self,
        user_id: Uuid,
        status: VoiceProfileStatus,
    ) -> Result<i64, PostgresError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM voice_profiles WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(self.pool())
        .await?;

        Ok(count.0)
    }

    pub async fn mark_voice_profile_deployed(&self, id: Uuid) -> Result<(), PostgresError> {
        sqlx::query("UPDATE voice_profiles SET deployed_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Oldest completed purchase with generation credit left
    pub async fn find_purchase_with_credit(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Purchase>, PostgresError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT * FROM purchases
            WHERE user_id = $1
              AND status = 'completed'
              AND generations_used < generations_allowed
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(purchase)
    }

    /// Consume one generation credit; returns false when none remain
    ///
    /// The counter guard in the WHERE clause keeps concurrent generation
    /// requests from overdrawing a purchase.
    pub async fn consume_generation(&self, purchase_id: Uuid) -> Result<bool, PostgresError> {
        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET generations_used = generations_used + 1
            WHERE id = $1 AND generations_used < generations_allowed
            "#,
        )
        .bind(purchase_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Total unused generation credits across completed purchases
    pub async fn generations_remaining(&self, user_id: Uuid) -> Result<i32, PostgresError> {
        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(generations_allowed - generations_used), 0)
            FROM purchases
            WHERE user_id = $1 AND status = 'completed'
            "#,
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok(total.0 as i32)
    }
}
