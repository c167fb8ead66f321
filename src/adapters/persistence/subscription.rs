use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::SubscriptionRepo,
    domain::entities::{
        payment_provider::PaymentProvider,
        subscription::{Subscription, SubscriptionStatus, SubscriptionUpsert},
    },
};

const SELECT_COLS: &str = r#"
    id, user_id, plan_id, provider, provider_subscription_id, provider_customer_id,
    status, trial_start, trial_end, created_at, updated_at
"#;

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SELECT_COLS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)
    }

    async fn get_by_provider_subscription_id(
        &self,
        provider: PaymentProvider,
        provider_subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SELECT_COLS} FROM subscriptions WHERE provider = $1 AND provider_subscription_id = $2"
        ))
        .bind(provider)
        .bind(provider_subscription_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)
    }

    async fn upsert(&self, input: &SubscriptionUpsert) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan_id, provider, provider_subscription_id,
                provider_customer_id, status, trial_start, trial_end
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE SET
                plan_id = EXCLUDED.plan_id,
                provider = EXCLUDED.provider,
                provider_subscription_id = EXCLUDED.provider_subscription_id,
                provider_customer_id = EXCLUDED.provider_customer_id,
                status = EXCLUDED.status,
                trial_start = EXCLUDED.trial_start,
                trial_end = EXCLUDED.trial_end,
                updated_at = NOW()
            RETURNING {SELECT_COLS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.plan_id)
        .bind(input.provider)
        .bind(&input.provider_subscription_id)
        .bind(&input.provider_customer_id)
        .bind(input.status)
        .bind(input.trial_start)
        .bind(input.trial_end)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)
    }

    async fn set_status(&self, id: Uuid, status: SubscriptionStatus) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>(&format!(
            "UPDATE subscriptions SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {SELECT_COLS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)
    }

    async fn set_plan(&self, id: Uuid, plan_id: &str) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>(&format!(
            "UPDATE subscriptions SET plan_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {SELECT_COLS}"
        ))
        .bind(id)
        .bind(plan_id)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)
    }

    async fn expire_trials(
        &self,
        cutoff: DateTime<Utc>,
        user_id: Option<Uuid>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'trialing'
              AND trial_start IS NOT NULL
              AND trial_start <= $1
              AND ($2::uuid IS NULL OR user_id = $2)
            "#,
        )
        .bind(cutoff)
        .bind(user_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }

    async fn rewrite_plan_id(&self, from: &str, to: &str) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE subscriptions SET plan_id = $2, updated_at = NOW() WHERE plan_id = $1",
        )
        .bind(from)
        .bind(to)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }
}
