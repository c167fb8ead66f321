use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::PaymentRepo,
    domain::entities::payment::{NewPayment, PaymentRecord},
};

#[async_trait]
impl PaymentRepo for PostgresPersistence {
    async fn insert_if_absent(&self, payment: &NewPayment) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, subscription_id, provider, provider_payment_id,
                amount_cents, currency, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (provider, provider_payment_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment.subscription_id)
        .bind(payment.provider)
        .bind(&payment.provider_payment_id)
        .bind(payment.amount.amount_cents)
        .bind(&payment.amount.currency)
        .bind(payment.status)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_subscription(&self, subscription_id: Uuid) -> AppResult<Vec<PaymentRecord>> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT id, subscription_id, provider, provider_payment_id,
                   amount_cents, currency, status, created_at
            FROM payments
            WHERE subscription_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(subscription_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)
    }
}
