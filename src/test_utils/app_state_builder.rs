//! `AppState` over in-memory repos and recording providers for route tests.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::http::HeaderValue;
use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        provider_registry::PaymentProviderRegistry, reconciler::ReconcilerUseCases,
        subscription::SubscriptionUseCases, webhook::WebhookUseCases,
    },
    domain::entities::{
        payment_provider::{PaymentEnvironment, PaymentProvider},
        subscription::Subscription,
    },
    infra::{
        config::AppConfig,
        rate_limit::{RateLimitBackend, RateLimiter},
    },
    test_utils::{
        InMemoryPaymentRepo, InMemoryRateLimitBackend, InMemorySubscriptionRepo,
        InMemoryWebhookEventRepo, RecordingEmailSender, RecordingPaymentProvider,
    },
};

pub const TEST_SUPPORT_EMAIL: &str = "support@dosetrack.test";

/// Config with no webhook secrets and no provider credentials.
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        redis_url: String::new(),
        bind_addr: "127.0.0.1:3001".parse().unwrap(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        jwt_secret: SecretString::new("test_jwt_secret".into()),
        payment_environment: PaymentEnvironment::Sandbox,
        default_provider: PaymentProvider::Square,
        square_access_token: None,
        square_location_id: String::new(),
        gocardless_access_token: None,
        checkout_secret_key: None,
        webhook_secrets: HashMap::new(),
        plan_change_rate_limit: 100,
        plan_change_rate_window_secs: 3600,
        rate_limit_timeout_ms: 100,
        trial_sweep_interval_secs: 3600,
        resend_api_key: SecretString::new("test_resend_key".into()),
        email_from: "noreply@dosetrack.test".to_string(),
        support_email: TEST_SUPPORT_EMAIL.to_string(),
    }
}

// ============================================================================
// TestAppStateBuilder
// ============================================================================

/// Builder for `AppState` backed by in-memory mocks.
///
/// Repos and doubles are created up front so tests can keep a handle for
/// assertions after the state is built.
///
/// ```ignore
/// let builder = TestAppStateBuilder::new()
///     .with_subscription(create_test_subscription(user_id, |_| {}))
///     .with_webhook_secret(PaymentProvider::Square, "whsec");
/// let subscriptions = builder.subscription_repo();
/// let app_state = builder.build();
/// ```
pub struct TestAppStateBuilder {
    config: AppConfig,
    subscriptions: Arc<InMemorySubscriptionRepo>,
    payments: Arc<InMemoryPaymentRepo>,
    webhook_events: Arc<InMemoryWebhookEventRepo>,
    square: Arc<RecordingPaymentProvider>,
    email: Arc<RecordingEmailSender>,
    rate_limit_backend: Arc<dyn RateLimitBackend>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            subscriptions: Arc::new(InMemorySubscriptionRepo::new()),
            payments: Arc::new(InMemoryPaymentRepo::new()),
            webhook_events: Arc::new(InMemoryWebhookEventRepo::new()),
            square: Arc::new(RecordingPaymentProvider::new(PaymentProvider::Square)),
            email: Arc::new(RecordingEmailSender::new()),
            rate_limit_backend: Arc::new(InMemoryRateLimitBackend::new()),
        }
    }

    pub fn with_subscription(self, subscription: Subscription) -> Self {
        self.subscriptions.insert(subscription);
        self
    }

    pub fn with_webhook_secret(mut self, provider: PaymentProvider, secret: &str) -> Self {
        self.config
            .webhook_secrets
            .insert(provider, SecretString::new(secret.into()));
        self
    }

    /// Requests allowed per user per window.
    pub fn with_rate_limit(mut self, limit: u64) -> Self {
        self.config.plan_change_rate_limit = limit;
        self
    }

    pub fn with_rate_limit_backend(mut self, backend: Arc<dyn RateLimitBackend>) -> Self {
        self.rate_limit_backend = backend;
        self
    }

    pub fn subscription_repo(&self) -> Arc<InMemorySubscriptionRepo> {
        self.subscriptions.clone()
    }

    pub fn payment_repo(&self) -> Arc<InMemoryPaymentRepo> {
        self.payments.clone()
    }

    pub fn webhook_event_repo(&self) -> Arc<InMemoryWebhookEventRepo> {
        self.webhook_events.clone()
    }

    /// The only registered provider.
    pub fn square_provider(&self) -> Arc<RecordingPaymentProvider> {
        self.square.clone()
    }

    pub fn email_sender(&self) -> Arc<RecordingEmailSender> {
        self.email.clone()
    }

    pub fn build(self) -> AppState {
        let providers = PaymentProviderRegistry::new().register(self.square);

        let subscription_use_cases = Arc::new(SubscriptionUseCases::new(
            self.subscriptions.clone(),
            self.payments.clone(),
            providers,
            self.config.default_provider,
            self.email,
            self.config.support_email.clone(),
        ));

        let reconciler = Arc::new(ReconcilerUseCases::new(self.subscriptions, self.payments));
        let webhook_use_cases = Arc::new(WebhookUseCases::new(self.webhook_events, reconciler));

        let rate_limiter = Arc::new(RateLimiter::new(
            self.rate_limit_backend,
            self.config.plan_change_rate_limit,
            Duration::from_secs(self.config.plan_change_rate_window_secs),
            Duration::from_millis(self.config.rate_limit_timeout_ms),
        ));

        AppState {
            config: Arc::new(self.config),
            subscription_use_cases,
            webhook_use_cases,
            rate_limiter,
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
