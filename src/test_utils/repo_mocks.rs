//! In-memory implementations of the repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        subscription::{PaymentRepo, SubscriptionRepo},
        webhook::WebhookEventRepo,
    },
    domain::entities::{
        payment::{NewPayment, PaymentRecord},
        payment_provider::PaymentProvider,
        subscription::{Subscription, SubscriptionStatus, SubscriptionUpsert},
    },
};

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

/// Keyed by user, like the `user_id` unique constraint.
#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<HashMap<Uuid, Subscription>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        let map = subscriptions.into_iter().map(|s| (s.user_id, s)).collect();
        Self {
            subscriptions: Mutex::new(map),
        }
    }

    pub fn insert(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.user_id, subscription);
    }

    pub fn get_user(&self, user_id: Uuid) -> Option<Subscription> {
        self.subscriptions.lock().unwrap().get(&user_id).cloned()
    }

    fn update(&self, id: Uuid, apply: impl FnOnce(&mut Subscription)) -> AppResult<Subscription> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .values_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::not_found("Record not found"))?;
        apply(subscription);
        subscription.updated_at = Utc::now();
        Ok(subscription.clone())
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.subscriptions.lock().unwrap().get(&user_id).cloned())
    }

    async fn get_by_provider_subscription_id(
        &self,
        provider: PaymentProvider,
        provider_subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .find(|s| {
                s.provider == provider
                    && s.provider_subscription_id.as_deref() == Some(provider_subscription_id)
            })
            .cloned())
    }

    async fn upsert(&self, input: &SubscriptionUpsert) -> AppResult<Subscription> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let now = Utc::now();
        let existing = subscriptions.get(&input.user_id);

        let subscription = Subscription {
            id: existing.map(|s| s.id).unwrap_or_else(Uuid::new_v4),
            user_id: input.user_id,
            plan_id: input.plan_id.clone(),
            provider: input.provider,
            provider_subscription_id: input.provider_subscription_id.clone(),
            provider_customer_id: input.provider_customer_id.clone(),
            status: input.status,
            trial_start: input.trial_start,
            trial_end: input.trial_end,
            created_at: existing.map(|s| s.created_at).unwrap_or(now),
            updated_at: now,
        };

        subscriptions.insert(input.user_id, subscription.clone());
        Ok(subscription)
    }

    async fn set_status(&self, id: Uuid, status: SubscriptionStatus) -> AppResult<Subscription> {
        self.update(id, |s| s.status = status)
    }

    async fn set_plan(&self, id: Uuid, plan_id: &str) -> AppResult<Subscription> {
        self.update(id, |s| s.plan_id = plan_id.to_string())
    }

    async fn expire_trials(
        &self,
        cutoff: DateTime<Utc>,
        user_id: Option<Uuid>,
    ) -> AppResult<u64> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let mut expired = 0;
        for subscription in subscriptions.values_mut() {
            let matches_user = user_id.is_none_or(|id| id == subscription.user_id);
            let lapsed = subscription.trial_start.is_some_and(|start| start <= cutoff);
            if matches_user && lapsed && subscription.status == SubscriptionStatus::Trialing {
                subscription.status = SubscriptionStatus::Expired;
                subscription.updated_at = Utc::now();
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn rewrite_plan_id(&self, from: &str, to: &str) -> AppResult<u64> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let mut rewritten = 0;
        for subscription in subscriptions.values_mut().filter(|s| s.plan_id == from) {
            subscription.plan_id = to.to_string();
            rewritten += 1;
        }
        Ok(rewritten)
    }
}

// ============================================================================
// InMemoryPaymentRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPaymentRepo {
    pub payments: Mutex<Vec<PaymentRecord>>,
}

impl InMemoryPaymentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<PaymentRecord> {
        self.payments.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentRepo for InMemoryPaymentRepo {
    async fn insert_if_absent(&self, payment: &NewPayment) -> AppResult<bool> {
        let mut payments = self.payments.lock().unwrap();
        let duplicate = payments.iter().any(|p| {
            p.provider == payment.provider && p.provider_payment_id == payment.provider_payment_id
        });
        if duplicate {
            return Ok(false);
        }

        payments.push(PaymentRecord {
            id: Uuid::new_v4(),
            subscription_id: payment.subscription_id,
            provider: payment.provider,
            provider_payment_id: payment.provider_payment_id.clone(),
            amount_cents: payment.amount.amount_cents,
            currency: payment.amount.currency.clone(),
            status: payment.status,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_by_subscription(&self, subscription_id: Uuid) -> AppResult<Vec<PaymentRecord>> {
        let mut payments: Vec<_> = self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.subscription_id == subscription_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}

// ============================================================================
// InMemoryWebhookEventRepo
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoredWebhookEvent {
    pub event_type: String,
    pub payload: JsonValue,
    pub attempts: u32,
    pub processed: bool,
    pub last_error: Option<String>,
}

#[derive(Default)]
pub struct InMemoryWebhookEventRepo {
    pub events: Mutex<HashMap<(PaymentProvider, String), StoredWebhookEvent>>,
}

impl InMemoryWebhookEventRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, provider: PaymentProvider, event_id: &str) -> Option<StoredWebhookEvent> {
        self.events
            .lock()
            .unwrap()
            .get(&(provider, event_id.to_string()))
            .cloned()
    }

    pub fn is_processed(&self, provider: PaymentProvider, event_id: &str) -> bool {
        self.get(provider, event_id).is_some_and(|e| e.processed)
    }

    pub fn last_error(&self, provider: PaymentProvider, event_id: &str) -> Option<String> {
        self.get(provider, event_id).and_then(|e| e.last_error)
    }
}

#[async_trait]
impl WebhookEventRepo for InMemoryWebhookEventRepo {
    async fn record_received(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        event_type: &str,
        payload: &JsonValue,
    ) -> AppResult<bool> {
        let mut events = self.events.lock().unwrap();
        let entry = events
            .entry((provider, event_id.to_string()))
            .and_modify(|e| e.attempts += 1)
            .or_insert_with(|| StoredWebhookEvent {
                event_type: event_type.to_string(),
                payload: payload.clone(),
                attempts: 1,
                processed: false,
                last_error: None,
            });
        Ok(entry.processed)
    }

    async fn mark_processed(&self, provider: PaymentProvider, event_id: &str) -> AppResult<()> {
        if let Some(event) = self
            .events
            .lock()
            .unwrap()
            .get_mut(&(provider, event_id.to_string()))
        {
            event.processed = true;
            event.last_error = None;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        error: &str,
    ) -> AppResult<()> {
        if let Some(event) = self
            .events
            .lock()
            .unwrap()
            .get_mut(&(provider, event_id.to_string()))
        {
            event.last_error = Some(error.to_string());
        }
        Ok(())
    }
}
