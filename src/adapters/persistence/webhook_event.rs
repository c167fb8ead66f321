use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::webhook::WebhookEventRepo,
    domain::entities::payment_provider::PaymentProvider,
};

#[async_trait]
impl WebhookEventRepo for PostgresPersistence {
    async fn record_received(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        event_type: &str,
        payload: &JsonValue,
    ) -> AppResult<bool> {
        // A redelivery bumps the attempt counter and keeps the first payload.
        let row = sqlx::query(
            r#"
            INSERT INTO webhook_events (id, provider, event_id, event_type, payload)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (provider, event_id) DO UPDATE SET
                attempts = webhook_events.attempts + 1
            RETURNING processed_at IS NOT NULL AS already_processed
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(provider)
        .bind(event_id)
        .bind(event_type)
        .bind(payload)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.get("already_processed"))
    }

    async fn mark_processed(&self, provider: PaymentProvider, event_id: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET processed_at = NOW(), last_error = NULL
            WHERE provider = $1 AND event_id = $2
            "#,
        )
        .bind(provider)
        .bind(event_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        error: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE webhook_events SET last_error = $3 WHERE provider = $1 AND event_id = $2",
        )
        .bind(provider)
        .bind(event_id)
        .bind(error)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
