//! Doubles for outbound collaborators: payment providers, email, rate-limit storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_provider::{
            CreateSubscriptionRequest, CustomerId, PaymentProviderPort, ProviderSubscription,
            SubscriptionId,
        },
        use_cases::subscription::EmailSender,
    },
    domain::entities::{payment_provider::PaymentProvider, plan::Plan},
    infra::{
        InfraError,
        rate_limit::{RateLimitBackend, RateLimitDecision},
    },
};

// ============================================================================
// RecordingPaymentProvider
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Create { customer_id: String, plan_id: String },
    Cancel { subscription_id: String },
    ChangePlan { subscription_id: String, plan_id: String },
}

/// Records every call; `fail_next` makes the next call return `AppError::Provider`.
pub struct RecordingPaymentProvider {
    provider: PaymentProvider,
    calls: Mutex<Vec<ProviderCall>>,
    failure: Mutex<Option<String>>,
}

impl RecordingPaymentProvider {
    pub fn new(provider: PaymentProvider) -> Self {
        Self {
            provider,
            calls: Mutex::new(vec![]),
            failure: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    fn record(&self, call: ProviderCall) -> AppResult<()> {
        if let Some(message) = self.failure.lock().unwrap().take() {
            return Err(AppError::Provider(message));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl PaymentProviderPort for RecordingPaymentProvider {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn create_subscription(
        &self,
        request: &CreateSubscriptionRequest,
    ) -> AppResult<ProviderSubscription> {
        self.record(ProviderCall::Create {
            customer_id: request.customer_id.to_string(),
            plan_id: request.plan.id.to_string(),
        })?;
        let n = self.calls.lock().unwrap().len();
        Ok(ProviderSubscription {
            subscription_id: SubscriptionId::new(format!("{}_sub_{n}", self.provider)),
            customer_id: CustomerId::new(request.customer_id.as_str()),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &SubscriptionId) -> AppResult<()> {
        self.record(ProviderCall::Cancel {
            subscription_id: subscription_id.to_string(),
        })
    }

    async fn change_plan(&self, subscription_id: &SubscriptionId, plan: &Plan) -> AppResult<()> {
        self.record(ProviderCall::ChangePlan {
            subscription_id: subscription_id.to_string(),
            plan_id: plan.id.to_string(),
        })
    }
}

// ============================================================================
// RecordingEmailSender
// ============================================================================

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Rate limit backends
// ============================================================================

/// Sliding window over in-process timestamps.
#[derive(Default)]
pub struct InMemoryRateLimitBackend {
    hits: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl InMemoryRateLimitBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitBackend for InMemoryRateLimitBackend {
    async fn hit(
        &self,
        key: &str,
        limit: u64,
        window: Duration,
    ) -> Result<RateLimitDecision, InfraError> {
        let now = Utc::now();
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::days(365));
        let mut hits = self.hits.lock().unwrap();
        let entries = hits.entry(key.to_string()).or_default();
        entries.retain(|at| *at > now - window);

        let allowed = (entries.len() as u64) < limit;
        if allowed {
            entries.push(now);
        }
        let oldest = entries.first().copied().unwrap_or(now);

        Ok(RateLimitDecision {
            allowed,
            count: entries.len() as u64,
            reset_at: oldest + window,
        })
    }
}

/// Always errors, as if Redis were down.
pub struct UnavailableRateLimitBackend;

#[async_trait]
impl RateLimitBackend for UnavailableRateLimitBackend {
    async fn hit(
        &self,
        _key: &str,
        _limit: u64,
        _window: Duration,
    ) -> Result<RateLimitDecision, InfraError> {
        Err(InfraError::RateLimitBackend(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        ))))
    }
}

/// Answers only after `delay`.
pub struct SlowRateLimitBackend {
    delay: Duration,
}

impl SlowRateLimitBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RateLimitBackend for SlowRateLimitBackend {
    async fn hit(
        &self,
        _key: &str,
        _limit: u64,
        window: Duration,
    ) -> Result<RateLimitDecision, InfraError> {
        tokio::time::sleep(self.delay).await;
        Ok(RateLimitDecision {
            allowed: false,
            count: 0,
            reset_at: Utc::now() + chrono::Duration::from_std(window).unwrap_or_default(),
        })
    }
}
