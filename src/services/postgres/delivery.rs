use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{PostgresClient, PostgresError};
use crate::models::{DownloadToken, Lead};

impl PostgresClient {
    pub async fn insert_download_token(
        &self,
        user_id: Uuid,
        voice_profile_id: Uuid,
        expires_at: DateTime<Utc>,
        max_downloads: i32,
    ) -> Result<DownloadToken, PostgresError> {
        let query = r#"
            INSERT INTO download_tokens (token, user_id, voice_profile_id, expires_at, max_downloads, download_count, created_at)
            VALUES ($1, $2, $3, $4, $5, 0, NOW())
            RETURNING *
        "#;

        let token = sqlx::query_as::<_, DownloadToken>(query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(voice_profile_id)
            .bind(expires_at)
            .bind(max_downloads)
            .fetch_one(self.pool())
            .await?;

        Ok(token)
    }

    pub async fn get_download_token(
        &self,
        token: Uuid,
    ) -> Result<Option<DownloadToken>, PostgresError> {
        let row = sqlx::query_as::<_, DownloadToken>(
            "SELECT * FROM download_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    /// Count-then-consume guard for the per-token cap; returns false when
    /// the cap was already spent.
    pub async fn consume_download(&self, token: Uuid) -> Result<bool, PostgresError> {
        let result = sqlx::query(
            r#"
            UPDATE download_tokens
            SET download_count = download_count + 1
            WHERE token = $1 AND download_count < max_downloads
            "#,
        )
        .bind(token)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn record_download_event(&self, user_id: Uuid) -> Result<(), PostgresError> {
        sqlx::query("INSERT INTO download_events (user_id, created_at) VALUES ($1, NOW())")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    pub async fn count_downloads_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, PostgresError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM download_events WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(self.pool())
        .await?;

        Ok(count.0)
    }

    pub async fn record_test_event(&self, user_id: Uuid) -> Result<(), PostgresError> {
        sqlx::query("INSERT INTO voice_test_events (user_id, created_at) VALUES ($1, NOW())")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    pub async fn count_tests_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, PostgresError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM voice_test_events WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(self.pool())
        .await?;

        Ok(count.0)
    }

    pub async fn count_leads_from_ip(
        &self,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, PostgresError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM leads WHERE ip = $1 AND created_at >= $2",
        )
        .bind(ip)
        .bind(since)
        .fetch_one(self.pool())
        .await?;

        Ok(count.0)
    }

    /// Insert-or-touch a lead; the bool is false when the email already existed
    pub async fn upsert_lead(
        &self,
        email: &str,
        source: Option<&str>,
        ip: Option<&str>,
    ) -> Result<(Lead, bool), PostgresError> {
        // xmax = 0 only on freshly inserted rows
        let query = r#"
            INSERT INTO leads (id, email, source, ip, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (email)
            DO UPDATE SET source = COALESCE(leads.source, EXCLUDED.source)
            RETURNING *, (xmax = 0) AS inserted
        "#;

        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(source)
            .bind(ip)
            .fetch_one(self.pool())
            .await?;

        use sqlx::Row;
        let lead = Lead {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            source: row.try_get("source")?,
            ip: row.try_get("ip")?,
            created_at: row.try_get("created_at")?,
        };
        let inserted: bool = row.try_get("inserted")?;

        Ok((lead, inserted))
    }
}
