use chrono::Utc;
use uuid::Uuid;

use super::{PostgresClient, PostgresError};
use crate::core::FunnelStage;
use crate::models::{Profile, QuestionnaireResponse};

impl PostgresClient {
    /// Create-or-refresh a profile row from hosted-auth claims
    ///
    /// Referral attribution is captured once: an existing `referred_by`
    /// never gets overwritten on later logins.
    pub async fn upsert_profile(
        &self,
        user_id: Uuid,
        email: &str,
        referred_by: Option<&str>,
    ) -> Result<Profile, PostgresError> {
        let query = r#"
            INSERT INTO profiles (user_id, email, funnel_stage, referred_by, created_at, updated_at)
            VALUES ($1, $2, 'registered', $3, NOW(), NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                email = EXCLUDED.email,
                referred_by = COALESCE(profiles.referred_by, EXCLUDED.referred_by),
                updated_at = NOW()
            RETURNING *
        "#;

        let profile = sqlx::query_as::<_, Profile>(query)
            .bind(user_id)
            .bind(email)
            .bind(referred_by)
            .fetch_one(self.pool())
            .await?;

        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, PostgresError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(profile)
    }

    pub async fn update_display_name(
        &self,
        user_id: Uuid,
        display_name: &str,
    ) -> Result<Profile, PostgresError> {
        let query = r#"
            UPDATE profiles
            SET display_name = $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
        "#;

        sqlx::query_as::<_, Profile>(query)
            .bind(user_id)
            .bind(display_name)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("Profile not found: {}", user_id)))
    }

    /// Advance the funnel stage, never backwards
    ///
    /// The guard relies on Postgres enum ordering, which follows the
    /// declaration order of the `funnel_stage` type.
    pub async fn advance_funnel(
        &self,
        user_id: Uuid,
        target: FunnelStage,
    ) -> Result<(), PostgresError> {
        let query = r#"
            UPDATE profiles
            SET funnel_stage = $2, updated_at = NOW()
            WHERE user_id = $1 AND funnel_stage < $2
        "#;

        let result = sqlx::query(query)
            .bind(user_id)
            .bind(target)
            .execute(self.pool())
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!("User {} advanced to funnel stage {}", user_id, target.as_str());
        }

        Ok(())
    }

    /// Store questionnaire answers; answering again replaces the previous set
    pub async fn upsert_questionnaire(
        &self,
        user_id: Uuid,
        answers: &serde_json::Value,
    ) -> Result<QuestionnaireResponse, PostgresError> {
        let query = r#"
            INSERT INTO questionnaire_responses (user_id, answers, completed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET
                answers = EXCLUDED.answers,
                completed_at = EXCLUDED.completed_at
            RETURNING *
        "#;

        let response = sqlx::query_as::<_, QuestionnaireResponse>(query)
            .bind(user_id)
            .bind(answers)
            .bind(Utc::now())
            .fetch_one(self.pool())
            .await?;

        Ok(response)
    }

    pub async fn get_questionnaire(
        &self,
        user_id: Uuid,
    ) -> Result<Option<QuestionnaireResponse>, PostgresError> {
        let response = sqlx::query_as::<_, QuestionnaireResponse>(
            "SELECT * FROM questionnaire_responses WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(response)
    }
}
