use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{payment_provider::PaymentProvider, plan::Plan},
};

// ============================================================================
// Port Types - Provider-agnostic domain types
// ============================================================================

/// Unique identifier for a customer in a payment provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a subscription in a payment provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a provider needs to start a subscription with a trial.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionRequest {
    pub user_id: Uuid,
    /// Customer (or mandate) reference the client obtained from the provider's
    /// hosted payment form.
    pub customer_id: CustomerId,
    pub plan: &'static Plan,
    pub trial_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSubscription {
    pub subscription_id: SubscriptionId,
    pub customer_id: CustomerId,
}

// ============================================================================
// Port Trait
// ============================================================================

/// Remote mutations against a payment provider.
///
/// Local state is never written here; webhooks bring it back in line.
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    async fn create_subscription(
        &self,
        request: &CreateSubscriptionRequest,
    ) -> AppResult<ProviderSubscription>;

    async fn cancel_subscription(&self, subscription_id: &SubscriptionId) -> AppResult<()>;

    async fn change_plan(&self, subscription_id: &SubscriptionId, plan: &Plan) -> AppResult<()>;
}
