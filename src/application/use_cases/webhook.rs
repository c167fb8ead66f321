use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, instrument, warn};

use crate::{
    app_error::AppResult,
    application::use_cases::reconciler::{ReconcileOutcome, ReconcilerUseCases},
    domain::entities::{payment_provider::PaymentProvider, webhook::ProviderEvent},
};

// ============================================================================
// Repository Traits
// ============================================================================

/// Audit breadcrumb per provider event, also used for replay detection.
#[async_trait]
pub trait WebhookEventRepo: Send + Sync {
    /// Records (or re-records) the delivery. Returns true when the event was
    /// already processed successfully.
    async fn record_received(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        event_type: &str,
        payload: &JsonValue,
    ) -> AppResult<bool>;

    async fn mark_processed(&self, provider: PaymentProvider, event_id: &str) -> AppResult<()>;

    async fn mark_failed(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        error: &str,
    ) -> AppResult<()>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookSummary {
    pub applied: usize,
    pub ignored: usize,
    pub replayed: usize,
}

// ============================================================================
// Use Cases
// ============================================================================

pub struct WebhookUseCases {
    events: Arc<dyn WebhookEventRepo>,
    reconciler: Arc<ReconcilerUseCases>,
}

impl WebhookUseCases {
    pub fn new(events: Arc<dyn WebhookEventRepo>, reconciler: Arc<ReconcilerUseCases>) -> Self {
        Self { events, reconciler }
    }

    /// Apply a verified, decoded delivery.
    ///
    /// Stops at the first failing event and returns its error so the provider
    /// redelivers; events before it are already marked processed and will be
    /// skipped on the retry.
    #[instrument(skip(self, events, payload), fields(count = events.len()))]
    pub async fn process(
        &self,
        events: &[ProviderEvent],
        payload: &JsonValue,
    ) -> AppResult<WebhookSummary> {
        let mut summary = WebhookSummary::default();

        for event in events {
            let already_processed = self
                .events
                .record_received(event.provider, &event.event_id, &event.event_type, payload)
                .await?;
            if already_processed {
                info!(
                    provider = %event.provider,
                    event_id = %event.event_id,
                    "Skipping replayed webhook event"
                );
                summary.replayed += 1;
                continue;
            }

            match self.reconciler.apply(event).await {
                Ok(outcome) => {
                    self.events
                        .mark_processed(event.provider, &event.event_id)
                        .await?;
                    match outcome {
                        ReconcileOutcome::Ignored(_) => summary.ignored += 1,
                        _ => summary.applied += 1,
                    }
                }
                Err(err) => {
                    warn!(
                        provider = %event.provider,
                        event_id = %event.event_id,
                        event_type = %event.event_type,
                        error = %err,
                        "Webhook event failed; provider will redeliver"
                    );
                    if let Err(store_err) = self
                        .events
                        .mark_failed(event.provider, &event.event_id, &err.to_string())
                        .await
                    {
                        warn!(error = %store_err, "Failed to record webhook failure");
                    }
                    return Err(err);
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app_error::AppError,
        application::use_cases::subscription::SubscriptionRepo,
        domain::entities::{
            payment::Money,
            subscription::{Subscription, SubscriptionStatus},
            webhook::{EventKind, PaymentSucceeded},
        },
        test_utils::{
            InMemoryPaymentRepo, InMemorySubscriptionRepo, InMemoryWebhookEventRepo,
            create_test_subscription,
        },
    };
    use uuid::Uuid;

    struct Harness {
        use_cases: WebhookUseCases,
        subscriptions: Arc<InMemorySubscriptionRepo>,
        payments: Arc<InMemoryPaymentRepo>,
        events: Arc<InMemoryWebhookEventRepo>,
    }

    fn harness(subscriptions: Vec<Subscription>) -> Harness {
        let subscription_repo = Arc::new(InMemorySubscriptionRepo::with_subscriptions(subscriptions));
        let payments = Arc::new(InMemoryPaymentRepo::new());
        let events = Arc::new(InMemoryWebhookEventRepo::new());
        let reconciler = Arc::new(ReconcilerUseCases::new(
            subscription_repo.clone(),
            payments.clone(),
        ));
        Harness {
            use_cases: WebhookUseCases::new(events.clone(), reconciler),
            subscriptions: subscription_repo,
            payments,
            events,
        }
    }

    fn paid(event_id: &str, payment_id: &str) -> ProviderEvent {
        ProviderEvent {
            provider: PaymentProvider::Square,
            event_id: event_id.into(),
            event_type: "invoice.payment_made".into(),
            occurred_at: None,
            kind: EventKind::PaymentSucceeded(PaymentSucceeded {
                provider_payment_id: payment_id.into(),
                provider_subscription_id: "sq_sub_1".into(),
                amount: Some(Money::new(499, "USD")),
            }),
        }
    }

    #[tokio::test]
    async fn replayed_delivery_is_skipped() {
        let user_id = Uuid::new_v4();
        let h = harness(vec![create_test_subscription(user_id, |_| {})]);
        let events = vec![paid("evt_1", "pay_1")];
        let payload = serde_json::json!({"event_id": "evt_1"});

        let first = h.use_cases.process(&events, &payload).await.unwrap();
        let second = h.use_cases.process(&events, &payload).await.unwrap();

        assert_eq!(first.applied, 1);
        assert_eq!(second.replayed, 1);
        assert_eq!(h.payments.all().len(), 1);
        assert!(h.events.is_processed(PaymentProvider::Square, "evt_1"));

        let stored = h.subscriptions.get_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn failure_is_recorded_and_returned() {
        let h = harness(vec![]);
        let events = vec![paid("evt_early", "pay_1")];

        let err = h
            .use_cases
            .process(&events, &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(!h.events.is_processed(PaymentProvider::Square, "evt_early"));
        assert!(
            h.events
                .last_error(PaymentProvider::Square, "evt_early")
                .is_some_and(|e| e.contains("No subscription"))
        );
    }

    #[tokio::test]
    async fn failed_event_is_retried_on_redelivery() {
        let user_id = Uuid::new_v4();
        let h = harness(vec![]);
        let events = vec![paid("evt_retry", "pay_1")];
        let payload = serde_json::json!({});

        assert!(h.use_cases.process(&events, &payload).await.is_err());

        h.subscriptions
            .insert(create_test_subscription(user_id, |_| {}));
        let summary = h.use_cases.process(&events, &payload).await.unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(h.payments.all().len(), 1);
    }

    #[tokio::test]
    async fn batch_stops_at_first_failure() {
        let user_id = Uuid::new_v4();
        let h = harness(vec![create_test_subscription(user_id, |_| {})]);
        let mut orphan = paid("evt_2", "pay_2");
        if let EventKind::PaymentSucceeded(p) = &mut orphan.kind {
            p.provider_subscription_id = "sq_sub_missing".into();
        }
        let events = vec![paid("evt_1", "pay_1"), orphan, paid("evt_3", "pay_3")];

        assert!(
            h.use_cases
                .process(&events, &serde_json::json!({}))
                .await
                .is_err()
        );

        assert!(h.events.is_processed(PaymentProvider::Square, "evt_1"));
        assert!(!h.events.is_processed(PaymentProvider::Square, "evt_3"));
        assert_eq!(h.payments.all().len(), 1);
    }

    #[tokio::test]
    async fn unrecognized_events_are_acknowledged() {
        let h = harness(vec![]);
        let events = vec![ProviderEvent {
            provider: PaymentProvider::Checkout,
            event_id: "evt_x".into(),
            event_type: "dispute_opened".into(),
            occurred_at: None,
            kind: EventKind::Unrecognized,
        }];

        let summary = h
            .use_cases
            .process(&events, &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(summary.ignored, 1);
        assert!(h.events.is_processed(PaymentProvider::Checkout, "evt_x"));
    }
}
