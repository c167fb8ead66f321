use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{email::resend::ResendEmailSender, http::app_state::AppState},
    application::ports::payment_provider::PaymentProviderPort,
    domain::entities::payment_provider::PaymentProvider,
    infra::{
        InfraError,
        checkout_client::CheckoutClient,
        config::AppConfig,
        gocardless_client::GoCardlessClient,
        http_client::try_build_client,
        postgres_persistence,
        rate_limit::{RateLimiter, RedisSlidingWindow},
        square_client::SquareClient,
    },
    use_cases::{
        provider_registry::PaymentProviderRegistry,
        reconciler::ReconcilerUseCases,
        subscription::{PaymentRepo, SubscriptionRepo, SubscriptionUseCases},
        webhook::{WebhookEventRepo, WebhookUseCases},
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);
    let http_client = try_build_client()?;

    let providers = provider_registry(&config, &http_client);
    for provider in PaymentProvider::all() {
        if !providers.is_configured(*provider) {
            warn!(provider = %provider, "Payment provider has no credentials; requests to it will fail");
        }
        if config.webhook_secret(*provider).is_none() {
            warn!(provider = %provider, "No webhook secret configured; its webhooks will be rejected");
        }
    }

    let email = Arc::new(ResendEmailSender::new(
        http_client,
        config.resend_api_key.clone(),
        config.email_from.clone(),
    ));

    let subscription_use_cases = Arc::new(SubscriptionUseCases::new(
        postgres_arc.clone() as Arc<dyn SubscriptionRepo>,
        postgres_arc.clone() as Arc<dyn PaymentRepo>,
        providers,
        config.default_provider,
        email,
        config.support_email.clone(),
    ));

    let reconciler = Arc::new(ReconcilerUseCases::new(
        postgres_arc.clone() as Arc<dyn SubscriptionRepo>,
        postgres_arc.clone() as Arc<dyn PaymentRepo>,
    ));
    let webhook_use_cases = Arc::new(WebhookUseCases::new(
        postgres_arc as Arc<dyn WebhookEventRepo>,
        reconciler,
    ));

    let rate_limiter = Arc::new(plan_change_rate_limiter(&config)?);

    let rewritten = subscription_use_cases.migrate_legacy_plan_ids().await?;
    if rewritten > 0 {
        info!(rewritten, "Legacy plan IDs migrated");
    }

    Ok(AppState {
        config: Arc::new(config),
        subscription_use_cases,
        webhook_use_cases,
        rate_limiter,
    })
}

/// Redis is not contacted here; while it is unreachable the limiter allows
/// every request and logs a warning.
pub fn plan_change_rate_limiter(config: &AppConfig) -> Result<RateLimiter, InfraError> {
    Ok(RateLimiter::new(
        Arc::new(RedisSlidingWindow::new(&config.redis_url)?),
        config.plan_change_rate_limit,
        Duration::from_secs(config.plan_change_rate_window_secs),
        Duration::from_millis(config.rate_limit_timeout_ms),
    ))
}

/// Registers a client for every provider whose credentials are present.
fn provider_registry(config: &AppConfig, client: &reqwest::Client) -> PaymentProviderRegistry {
    let env = config.payment_environment;
    let mut ports: Vec<Arc<dyn PaymentProviderPort>> = Vec::new();

    if let Some(token) = &config.square_access_token {
        ports.push(Arc::new(SquareClient::new(
            client.clone(),
            env,
            token.clone(),
            config.square_location_id.clone(),
        )));
    }
    if let Some(token) = &config.gocardless_access_token {
        ports.push(Arc::new(GoCardlessClient::new(client.clone(), env, token.clone())));
    }
    if let Some(key) = &config.checkout_secret_key {
        ports.push(Arc::new(CheckoutClient::new(client.clone(), env, key.clone())));
    }

    ports
        .into_iter()
        .fold(PaymentProviderRegistry::new(), PaymentProviderRegistry::register)
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dosetrack=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs), skipped when the file cannot be created
    let json_layer = File::create("app.log").ok().map(|file| {
        fmt::layer()
            .json()
            .with_writer(Arc::new(file))
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
