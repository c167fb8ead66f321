use std::{collections::HashMap, net::SocketAddr, str::FromStr};

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

use super::InfraError;
use crate::domain::entities::payment_provider::{PaymentEnvironment, PaymentProvider};

pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    /// Shared with the hosted auth service that issues session tokens.
    pub jwt_secret: SecretString,
    pub payment_environment: PaymentEnvironment,
    /// Used by `POST /api/subscription` when the client does not pick one.
    pub default_provider: PaymentProvider,
    pub square_access_token: Option<SecretString>,
    pub square_location_id: String,
    pub gocardless_access_token: Option<SecretString>,
    pub checkout_secret_key: Option<SecretString>,
    /// Providers without a secret reject webhooks with `WEBHOOK_NOT_CONFIGURED`.
    pub webhook_secrets: HashMap<PaymentProvider, SecretString>,
    pub plan_change_rate_limit: u64,
    pub plan_change_rate_window_secs: u64,
    pub rate_limit_timeout_ms: u64,
    pub trial_sweep_interval_secs: u64,
    pub resend_api_key: SecretString,
    pub email_from: String,
    pub support_email: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let database_url: String = get_env("DATABASE_URL");
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let bind_addr: SocketAddr = parse_var(
            "BIND_ADDR",
            get_env_default("BIND_ADDR", "127.0.0.1:3001".to_string()),
        )?;
        let cors_origin: HeaderValue = parse_var(
            "CORS_ORIGIN",
            get_env_default("CORS_ORIGIN", "http://localhost:3000".to_string()),
        )?;
        let jwt_secret = SecretString::new(get_env::<String>("AUTH_JWT_SECRET").into());

        let payment_environment: PaymentEnvironment = parse_var(
            "PAYMENT_ENVIRONMENT",
            get_env_default("PAYMENT_ENVIRONMENT", "sandbox".to_string()),
        )?;
        let default_provider: PaymentProvider = parse_var(
            "DEFAULT_PAYMENT_PROVIDER",
            get_env_default("DEFAULT_PAYMENT_PROVIDER", "square".to_string()),
        )?;

        let webhook_secrets = PaymentProvider::all()
            .iter()
            .filter_map(|provider| {
                optional_secret(&webhook_secret_var(*provider)).map(|secret| (*provider, secret))
            })
            .collect();

        Ok(Self {
            database_url,
            redis_url,
            bind_addr,
            cors_origin,
            jwt_secret,
            payment_environment,
            default_provider,
            square_access_token: optional_secret("SQUARE_ACCESS_TOKEN"),
            square_location_id: get_env_default("SQUARE_LOCATION_ID", String::new()),
            gocardless_access_token: optional_secret("GOCARDLESS_ACCESS_TOKEN"),
            checkout_secret_key: optional_secret("CHECKOUT_ACCESS_TOKEN"),
            webhook_secrets,
            plan_change_rate_limit: get_env_default("PLAN_CHANGE_RATE_LIMIT", 5),
            plan_change_rate_window_secs: get_env_default("PLAN_CHANGE_RATE_WINDOW_SECS", 3600),
            rate_limit_timeout_ms: get_env_default("RATE_LIMIT_TIMEOUT_MS", 2000),
            trial_sweep_interval_secs: get_env_default("TRIAL_SWEEP_INTERVAL_SECS", 3600),
            resend_api_key: SecretString::new(get_env::<String>("RESEND_API_KEY").into()),
            email_from: get_env("EMAIL_FROM"),
            support_email: get_env("SUPPORT_EMAIL"),
        })
    }

    pub fn webhook_secret(&self, provider: PaymentProvider) -> Option<&SecretString> {
        self.webhook_secrets.get(&provider)
    }
}

/// `SQUARE_WEBHOOK_SECRET`, `GOCARDLESS_WEBHOOK_SECRET`, ...
pub fn webhook_secret_var(provider: PaymentProvider) -> String {
    format!("{}_WEBHOOK_SECRET", provider.as_ref().to_uppercase())
}

fn optional_secret(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| SecretString::new(value.into()))
}

fn parse_var<T>(var: &'static str, raw: String) -> Result<T, InfraError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| InfraError::ConfigInvalid {
            var,
            reason: e.to_string(),
        })
}
