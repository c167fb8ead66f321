use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        email_templates::plan_change_request_email,
        ports::payment_provider::{CreateSubscriptionRequest, CustomerId, SubscriptionId},
        use_cases::provider_registry::PaymentProviderRegistry,
    },
    domain::entities::{
        payment::{NewPayment, PaymentRecord},
        payment_provider::PaymentProvider,
        plan::{LEGACY_PLAN_IDS, Plan, PlanCatalog, plans_renumbered_at},
        subscription::{Subscription, SubscriptionStatus, SubscriptionUpsert},
        trial,
    },
};

pub const MAX_PLAN_CHANGE_MESSAGE_LEN: usize = 2_000;

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>>;

    async fn get_by_provider_subscription_id(
        &self,
        provider: PaymentProvider,
        provider_subscription_id: &str,
    ) -> AppResult<Option<Subscription>>;

    /// Insert or overwrite the single row owned by `input.user_id`.
    async fn upsert(&self, input: &SubscriptionUpsert) -> AppResult<Subscription>;

    async fn set_status(&self, id: Uuid, status: SubscriptionStatus) -> AppResult<Subscription>;

    async fn set_plan(&self, id: Uuid, plan_id: &str) -> AppResult<Subscription>;

    /// Flip `trialing` rows whose trial started at or before `cutoff` to
    /// `expired`. Restricted to one user when `user_id` is given.
    async fn expire_trials(&self, cutoff: DateTime<Utc>, user_id: Option<Uuid>)
    -> AppResult<u64>;

    async fn rewrite_plan_id(&self, from: &str, to: &str) -> AppResult<u64>;
}

#[async_trait]
pub trait PaymentRepo: Send + Sync {
    /// Returns false when the provider payment was already recorded.
    async fn insert_if_absent(&self, payment: &NewPayment) -> AppResult<bool>;

    async fn list_by_subscription(&self, subscription_id: Uuid) -> AppResult<Vec<PaymentRecord>>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()>;
}

// ============================================================================
// Inputs / Outputs
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateSubscriptionInput {
    pub plan_id: String,
    pub provider: Option<PaymentProvider>,
    pub customer_id: String,
}

#[derive(Debug, Clone)]
pub struct PlanChangeRequestInput {
    pub requested_plan_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionOverview {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub plan: Option<&'static Plan>,
    pub has_access: bool,
    pub trial_days_remaining: Option<i64>,
    pub payments: Vec<PaymentRecord>,
}

/// Provider accepted a mutation; local state follows on the next webhook.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderChangeAccepted {
    pub subscription_id: Uuid,
    pub provider: PaymentProvider,
    pub plan_id: String,
}

// ============================================================================
// Use Cases
// ============================================================================

pub struct SubscriptionUseCases {
    subscriptions: Arc<dyn SubscriptionRepo>,
    payments: Arc<dyn PaymentRepo>,
    providers: PaymentProviderRegistry,
    default_provider: PaymentProvider,
    email: Arc<dyn EmailSender>,
    support_email: String,
    catalog: PlanCatalog,
}

impl SubscriptionUseCases {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepo>,
        payments: Arc<dyn PaymentRepo>,
        providers: PaymentProviderRegistry,
        default_provider: PaymentProvider,
        email: Arc<dyn EmailSender>,
        support_email: String,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            providers,
            default_provider,
            email,
            support_email,
            catalog: PlanCatalog,
        }
    }

    pub fn catalog(&self) -> PlanCatalog {
        self.catalog
    }

    /// Current subscription for the user, expiring a lapsed trial on the way.
    #[instrument(skip(self))]
    pub async fn status(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<SubscriptionOverview>> {
        let Some(mut subscription) = self.subscriptions.get_by_user(user_id).await? else {
            return Ok(None);
        };

        if subscription.status == SubscriptionStatus::Trialing
            && subscription
                .trial_start
                .is_some_and(|start| trial::is_expired(start, now))
        {
            let flipped = self
                .subscriptions
                .expire_trials(trial::expiry_cutoff(now), Some(user_id))
                .await?;
            if flipped > 0 {
                info!(%user_id, subscription_id = %subscription.id, "Trial expired on status check");
                subscription.status = SubscriptionStatus::Expired;
            } else {
                // Another writer got there first; it may have activated the row instead.
                let Some(current) = self.subscriptions.get_by_user(user_id).await? else {
                    return Ok(None);
                };
                subscription = current;
            }
        }

        let trial_days_remaining = match (subscription.status, subscription.trial_start) {
            (SubscriptionStatus::Trialing, Some(start)) => Some(trial::days_remaining(start, now)),
            _ => None,
        };
        let payments = self.payments.list_by_subscription(subscription.id).await?;

        Ok(Some(SubscriptionOverview {
            plan: self.catalog.resolve(&subscription.plan_id),
            has_access: subscription.status.grants_access(),
            trial_days_remaining,
            payments,
            subscription,
        }))
    }

    /// Start a subscription with the provider and record it locally as trialing.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateSubscriptionInput,
        now: DateTime<Utc>,
    ) -> AppResult<Subscription> {
        let plan_id = input.plan_id.trim();
        if plan_id.is_empty() {
            return Err(AppError::InvalidInput("plan_id is required".into()));
        }
        let customer_id = input.customer_id.trim();
        if customer_id.is_empty() {
            return Err(AppError::InvalidInput("customer_id is required".into()));
        }
        let plan = self
            .catalog
            .resolve(plan_id)
            .ok_or_else(|| AppError::precondition(format!("Unknown plan '{plan_id}'")))?;

        if let Some(existing) = self.subscriptions.get_by_user(user_id).await?
            && existing.status.grants_access()
        {
            return Err(AppError::precondition(
                "You already have an active subscription",
            ));
        }

        let provider = input.provider.unwrap_or(self.default_provider);
        let port = self.providers.get(provider)?;
        let created = port
            .create_subscription(&CreateSubscriptionRequest {
                user_id,
                customer_id: CustomerId::new(customer_id),
                plan,
                trial_days: trial::TRIAL_DAYS,
            })
            .await?;

        let subscription = self
            .subscriptions
            .upsert(&SubscriptionUpsert {
                user_id,
                plan_id: plan.id.to_string(),
                provider,
                provider_subscription_id: Some(created.subscription_id.0),
                provider_customer_id: Some(created.customer_id.0),
                status: SubscriptionStatus::Trialing,
                trial_start: Some(now),
                trial_end: Some(trial::trial_end(now)),
            })
            .await?;

        info!(
            %user_id,
            subscription_id = %subscription.id,
            provider = %provider,
            plan_id = plan.id,
            "Subscription created"
        );
        Ok(subscription)
    }

    /// Cancel at the provider. The row flips to canceled when the webhook lands.
    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid) -> AppResult<ProviderChangeAccepted> {
        let subscription = self.require_subscription(user_id).await?;

        if !subscription.status.grants_access() {
            return Err(AppError::precondition(format!(
                "Subscription is {} and cannot be canceled",
                subscription.status
            )));
        }

        let reference = provider_reference(&subscription)?;
        let port = self.providers.get(subscription.provider)?;
        port.cancel_subscription(&reference).await?;

        info!(
            %user_id,
            subscription_id = %subscription.id,
            provider = %subscription.provider,
            "Cancellation sent to provider"
        );
        Ok(ProviderChangeAccepted {
            subscription_id: subscription.id,
            provider: subscription.provider,
            plan_id: subscription.plan_id,
        })
    }

    /// Switch plans at the provider.
    ///
    /// Preconditions are checked in a fixed order so callers always see the
    /// most specific failure first.
    #[instrument(skip(self))]
    pub async fn change_plan(
        &self,
        user_id: Uuid,
        new_plan_id: &str,
    ) -> AppResult<ProviderChangeAccepted> {
        let new_plan_id = new_plan_id.trim();
        if new_plan_id.is_empty() {
            return Err(AppError::InvalidInput("new_plan_id is required".into()));
        }

        let subscription = self.require_subscription(user_id).await?;

        if subscription.status != SubscriptionStatus::Active {
            return Err(AppError::precondition(format!(
                "Plan changes require an active subscription (current status: {})",
                subscription.status
            )));
        }

        let target = self
            .catalog
            .resolve(new_plan_id)
            .ok_or_else(|| AppError::precondition(format!("Unknown plan '{new_plan_id}'")))?;

        let current_id = self
            .catalog
            .resolve(&subscription.plan_id)
            .map(|plan| plan.id)
            .unwrap_or(subscription.plan_id.as_str());
        if current_id == target.id {
            return Err(AppError::precondition(format!(
                "Subscription is already on plan '{}'",
                target.id
            )));
        }

        let reference = provider_reference(&subscription)?;
        let port = self.providers.get(subscription.provider)?;
        port.change_plan(&reference, target).await?;

        info!(
            %user_id,
            subscription_id = %subscription.id,
            from_plan = current_id,
            to_plan = target.id,
            "Plan change sent to provider"
        );
        Ok(ProviderChangeAccepted {
            subscription_id: subscription.id,
            provider: subscription.provider,
            plan_id: target.id.to_string(),
        })
    }

    /// Free-form plan change request, forwarded to support by email.
    #[instrument(skip(self, input), fields(requested_plan_id = ?input.requested_plan_id))]
    pub async fn request_plan_change(
        &self,
        user_id: Uuid,
        user_email: Option<&str>,
        input: PlanChangeRequestInput,
    ) -> AppResult<()> {
        let message = input.message.trim();
        if message.is_empty() {
            return Err(AppError::InvalidInput("message is required".into()));
        }
        if message.chars().count() > MAX_PLAN_CHANGE_MESSAGE_LEN {
            return Err(AppError::InvalidInput(format!(
                "message must be at most {MAX_PLAN_CHANGE_MESSAGE_LEN} characters"
            )));
        }

        let requested = match input.requested_plan_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Some(
                self.catalog
                    .resolve(id)
                    .ok_or_else(|| AppError::precondition(format!("Unknown plan '{id}'")))?,
            ),
            _ => None,
        };

        let current = self.subscriptions.get_by_user(user_id).await?;
        let current_plan = current
            .as_ref()
            .and_then(|s| self.catalog.resolve(&s.plan_id));

        let (subject, html) = plan_change_request_email(
            user_id,
            user_email,
            current.as_ref().map(|s| s.status),
            current_plan,
            requested,
            message,
        );
        self.email.send(&self.support_email, &subject, &html).await?;

        info!(%user_id, "Plan change request forwarded to support");
        Ok(())
    }

    /// Expire every trial that has run its full window.
    #[instrument(skip(self))]
    pub async fn sweep_expired_trials(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let expired = self
            .subscriptions
            .expire_trials(trial::expiry_cutoff(now), None)
            .await?;
        if expired > 0 {
            info!(expired, "Expired lapsed trials");
        }
        Ok(expired)
    }

    /// Rewrite stored pre-renumbering plan IDs to their current IDs.
    #[instrument(skip(self))]
    pub async fn migrate_legacy_plan_ids(&self) -> AppResult<u64> {
        let mut rewritten = 0;
        for (legacy, current) in LEGACY_PLAN_IDS {
            let count = self.subscriptions.rewrite_plan_id(legacy, current).await?;
            if count > 0 {
                info!(legacy, current, count, "Rewrote legacy plan ID");
            }
            rewritten += count;
        }
        if rewritten > 0 {
            warn!(
                rewritten,
                renumbered_at = %plans_renumbered_at(),
                "Found subscriptions still on pre-renumbering plan IDs"
            );
        }
        Ok(rewritten)
    }

    async fn require_subscription(&self, user_id: Uuid) -> AppResult<Subscription> {
        self.subscriptions
            .get_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("No subscription found"))
    }
}

fn provider_reference(subscription: &Subscription) -> AppResult<SubscriptionId> {
    subscription
        .provider_reference()
        .map(SubscriptionId::new)
        .ok_or_else(|| {
            tracing::error!(
                subscription_id = %subscription.id,
                provider = %subscription.provider,
                "Subscription has no provider subscription ID"
            );
            AppError::MissingProviderReference
        })
}
