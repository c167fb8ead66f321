use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entities::payment_provider::PaymentProvider;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Too many requests. Please try again later.")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Webhook secret for {0} is not configured")]
    WebhookNotConfigured(PaymentProvider),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Subscription has no provider subscription reference")]
    MissingProviderReference,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    DatabaseError,
    RateLimited,
    InvalidCredentials,
    InvalidSignature,
    WebhookNotConfigured,
    InvalidInput,
    PreconditionFailed,
    NotFound,
    MissingProviderReference,
    ProviderError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::WebhookNotConfigured => "WEBHOOK_NOT_CONFIGURED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MissingProviderReference => "MISSING_PROVIDER_REFERENCE",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::InvalidSignature => ErrorCode::InvalidSignature,
            AppError::WebhookNotConfigured(_) => ErrorCode::WebhookNotConfigured,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::Precondition(_) => ErrorCode::PreconditionFailed,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::MissingProviderReference => ErrorCode::MissingProviderReference,
            AppError::Provider(_) => ErrorCode::ProviderError,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        AppError::Precondition(msg.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
