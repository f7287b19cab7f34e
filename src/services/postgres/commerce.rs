use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{PostgresClient, PostgresError};
use crate::models::{
    Affiliate, CreditStatus, DiscountCode, Purchase, PurchaseStatus, ReferralCode,
    ReferralCredit, Subscription,
};

impl PostgresClient {
    pub async fn get_discount_code(
        &self,
        code: &str,
    ) -> Result<Option<DiscountCode>, PostgresError> {
        let row = sqlx::query_as::<_, DiscountCode>("SELECT * FROM discount_codes WHERE code = $1")
            .bind(code)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    pub async fn get_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<ReferralCode>, PostgresError> {
        let row = sqlx::query_as::<_, ReferralCode>("SELECT * FROM referral_codes WHERE code = $1")
            .bind(code)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    pub async fn get_referral_code_by_owner(
        &self,
        owner_user_id: Uuid,
    ) -> Result<Option<ReferralCode>, PostgresError> {
        let row = sqlx::query_as::<_, ReferralCode>(
            "SELECT * FROM referral_codes WHERE owner_user_id = $1",
        )
        .bind(owner_user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    /// Insert a referral code; returns None on a code collision so the
    /// caller can regenerate the suffix and retry.
    pub async fn try_insert_referral_code(
        &self,
        code: &str,
        owner_user_id: Uuid,
        percent_off: i32,
        referrer_credit_pct: i32,
    ) -> Result<Option<ReferralCode>, PostgresError> {
        let query = r#"
            INSERT INTO referral_codes (code, owner_user_id, percent_off, referrer_credit_pct, uses, active, created_at)
            VALUES ($1, $2, $3, $4, 0, TRUE, NOW())
            ON CONFLICT (code) DO NOTHING
            RETURNING *
        "#;

        let row = sqlx::query_as::<_, ReferralCode>(query)
            .bind(code)
            .bind(owner_user_id)
            .bind(percent_off)
            .bind(referrer_credit_pct)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    pub async fn increment_discount_use(&self, code: &str) -> Result<(), PostgresError> {
        sqlx::query("UPDATE discount_codes SET uses = uses + 1 WHERE code = $1")
            .bind(code)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    pub async fn increment_referral_use(&self, code: &str) -> Result<(), PostgresError> {
        sqlx::query("UPDATE referral_codes SET uses = uses + 1 WHERE code = $1")
            .bind(code)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    pub async fn get_affiliate_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Affiliate>, PostgresError> {
        let row = sqlx::query_as::<_, Affiliate>("SELECT * FROM affiliates WHERE code = $1")
            .bind(code)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    pub async fn get_affiliate(&self, user_id: Uuid) -> Result<Option<Affiliate>, PostgresError> {
        let row = sqlx::query_as::<_, Affiliate>("SELECT * FROM affiliates WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    /// Register an affiliate application; applications start `pending`
    pub async fn try_insert_affiliate(
        &self,
        user_id: Uuid,
        code: &str,
        commission_pct: i32,
    ) -> Result<Option<Affiliate>, PostgresError> {
        let query = r#"
            INSERT INTO affiliates (user_id, code, commission_pct, status, created_at)
            VALUES ($1, $2, $3, 'pending', NOW())
            ON CONFLICT (code) DO NOTHING
            RETURNING *
        "#;

        let row = sqlx::query_as::<_, Affiliate>(query)
            .bind(user_id)
            .bind(code)
            .bind(commission_pct)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_purchase(
        &self,
        user_id: Uuid,
        tier_id: &str,
        amount_cents: i64,
        currency: &str,
        discount_code: Option<&str>,
        referral_code: Option<&str>,
        checkout_session_id: &str,
        generations_allowed: i32,
    ) -> Result<Purchase, PostgresError> {
        let query = r#"
            INSERT INTO purchases (
                id, user_id, tier_id, amount_cents, currency,
                discount_code, referral_code, checkout_session_id,
                status, generations_allowed, generations_used, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, 0, NOW())
            RETURNING *
        "#;

        let purchase = sqlx::query_as::<_, Purchase>(query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(tier_id)
            .bind(amount_cents)
            .bind(currency)
            .bind(discount_code)
            .bind(referral_code)
            .bind(checkout_session_id)
            .bind(generations_allowed)
            .fetch_one(self.pool())
            .await?;

        Ok(purchase)
    }

    pub async fn list_purchases(&self, user_id: Uuid) -> Result<Vec<Purchase>, PostgresError> {
        let purchases = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(purchases)
    }

    /// Complete a purchase from its checkout session id, only if still pending
    ///
    /// Returns None when no pending purchase matched, which covers both an
    /// unknown session and an already-completed one.
    pub async fn complete_purchase_by_session(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<Purchase>, PostgresError> {
        let query = r#"
            UPDATE purchases
            SET status = 'completed', completed_at = NOW()
            WHERE checkout_session_id = $1 AND status = 'pending'
            RETURNING *
        "#;

        let purchase = sqlx::query_as::<_, Purchase>(query)
            .bind(checkout_session_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(purchase)
    }

    pub async fn set_purchase_status_by_session(
        &self,
        checkout_session_id: &str,
        from: PurchaseStatus,
        to: PurchaseStatus,
    ) -> Result<bool, PostgresError> {
        let result = sqlx::query(
            "UPDATE purchases SET status = $3 WHERE checkout_session_id = $1 AND status = $2",
        )
        .bind(checkout_session_id)
        .bind(from)
        .bind(to)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Idempotency guard: record a webhook event id, returning false when the
    /// event was already processed.
    pub async fn record_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        session_id: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<bool, PostgresError> {
        let query = r#"
            INSERT INTO webhook_events (event_id, event_type, session_id, payload, received_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (event_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(event_id)
            .bind(event_type)
            .bind(session_id)
            .bind(payload)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_referral_credit(
        &self,
        referrer_user_id: Uuid,
        referred_user_id: Uuid,
        purchase_id: Uuid,
        amount_cents: i64,
    ) -> Result<ReferralCredit, PostgresError> {
        let query = r#"
            INSERT INTO referral_credits (id, referrer_user_id, referred_user_id, purchase_id, amount_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', NOW())
            RETURNING *
        "#;

        let credit = sqlx::query_as::<_, ReferralCredit>(query)
            .bind(Uuid::new_v4())
            .bind(referrer_user_id)
            .bind(referred_user_id)
            .bind(purchase_id)
            .bind(amount_cents)
            .fetch_one(self.pool())
            .await?;

        Ok(credit)
    }

    pub async fn list_referral_credits(
        &self,
        referrer_user_id: Uuid,
    ) -> Result<Vec<ReferralCredit>, PostgresError> {
        let credits = sqlx::query_as::<_, ReferralCredit>(
            "SELECT * FROM referral_credits WHERE referrer_user_id = $1 ORDER BY created_at DESC",
        )
        .bind(referrer_user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(credits)
    }

    pub async fn sum_referral_credits(
        &self,
        referrer_user_id: Uuid,
        status: Option<CreditStatus>,
    ) -> Result<i64, PostgresError> {
        let total: (i64,) = match status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT COALESCE(SUM(amount_cents), 0) FROM referral_credits WHERE referrer_user_id = $1 AND status = $2",
                )
                .bind(referrer_user_id)
                .bind(status)
                .fetch_one(self.pool())
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT COALESCE(SUM(amount_cents), 0) FROM referral_credits WHERE referrer_user_id = $1",
                )
                .bind(referrer_user_id)
                .fetch_one(self.pool())
                .await?
            }
        };

        Ok(total.0)
    }

    /// Completed purchases that carried a given code
    pub async fn count_purchases_with_code(&self, code: &str) -> Result<i64, PostgresError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM purchases
            WHERE status = 'completed' AND (referral_code = $1 OR discount_code = $1)
            "#,
        )
        .bind(code)
        .fetch_one(self.pool())
        .await?;

        Ok(count.0)
    }

    /// Keyed on the provider subscription id so repeated webhook deliveries
    /// converge on the latest state.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_subscription(
        &self,
        user_id: Uuid,
        plan_id: &str,
        provider_subscription_id: &str,
        status: &str,
        current_period_end: Option<DateTime<Utc>>,
        cancel_at_period_end: bool,
    ) -> Result<Subscription, PostgresError> {
        let query = r#"
            INSERT INTO subscriptions (
                id, user_id, plan_id, provider_subscription_id, status,
                current_period_end, cancel_at_period_end, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            ON CONFLICT (provider_subscription_id)
            DO UPDATE SET
                status = EXCLUDED.status,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                updated_at = NOW()
            RETURNING *
        "#;

        let subscription = sqlx::query_as::<_, Subscription>(query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(plan_id)
            .bind(provider_subscription_id)
            .bind(status)
            .bind(current_period_end)
            .bind(cancel_at_period_end)
            .fetch_one(self.pool())
            .await?;

        Ok(subscription)
    }

    pub async fn update_subscription_state(
        &self,
        provider_subscription_id: &str,
        status: &str,
        current_period_end: Option<DateTime<Utc>>,
        cancel_at_period_end: bool,
    ) -> Result<bool, PostgresError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2, current_period_end = $3, cancel_at_period_end = $4, updated_at = NOW()
            WHERE provider_subscription_id = $1
            "#,
        )
        .bind(provider_subscription_id)
        .bind(status)
        .bind(current_period_end)
        .bind(cancel_at_period_end)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Latest subscription for a user, active or not
    pub async fn get_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, PostgresError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(subscription)
    }

    /// Completed playground-enabled tier ids owned by the user
    pub async fn completed_tier_ids(&self, user_id: Uuid) -> Result<Vec<String>, PostgresError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT tier_id FROM purchases WHERE user_id = $1 AND status = 'completed'",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
