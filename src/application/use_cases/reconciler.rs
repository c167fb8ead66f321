use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::subscription::{PaymentRepo, SubscriptionRepo},
    domain::entities::{
        payment::{NewPayment, PaymentStatus},
        payment_provider::PaymentProvider,
        plan::PlanCatalog,
        subscription::{Subscription, SubscriptionStatus, SubscriptionUpsert},
        trial,
        webhook::{EventKind, PaymentSucceeded, ProviderEvent, SubscriptionActivation},
    },
};

/// What applying one event did to local state.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Activated(Subscription),
    PlanChanged(Subscription),
    PaymentRecorded {
        subscription: Subscription,
        duplicate: bool,
    },
    Canceled(Subscription),
    /// Acknowledged without touching state.
    Ignored(&'static str),
}

/// Maps normalized provider events onto the stored subscription record.
///
/// Every transition is a single-row write that lands on the same target
/// state no matter how often it is replayed.
pub struct ReconcilerUseCases {
    subscriptions: Arc<dyn SubscriptionRepo>,
    payments: Arc<dyn PaymentRepo>,
    catalog: PlanCatalog,
}

impl ReconcilerUseCases {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepo>, payments: Arc<dyn PaymentRepo>) -> Self {
        Self {
            subscriptions,
            payments,
            catalog: PlanCatalog,
        }
    }

    #[instrument(
        skip(self, event),
        fields(
            provider = %event.provider,
            event_id = %event.event_id,
            event_type = %event.event_type,
            kind = event.kind.name()
        )
    )]
    pub async fn apply(&self, event: &ProviderEvent) -> AppResult<ReconcileOutcome> {
        self.apply_at(event, Utc::now()).await
    }

    pub async fn apply_at(
        &self,
        event: &ProviderEvent,
        now: DateTime<Utc>,
    ) -> AppResult<ReconcileOutcome> {
        match &event.kind {
            EventKind::SubscriptionActivated(activation) => {
                self.activate(event.provider, activation, now).await
            }
            EventKind::PlanChanged {
                provider_subscription_id,
                plan_reference,
            } => {
                self.change_plan(event.provider, provider_subscription_id, plan_reference)
                    .await
            }
            EventKind::PaymentSucceeded(payment) => {
                self.record_payment(event.provider, payment).await
            }
            EventKind::SubscriptionCanceled {
                provider_subscription_id,
            } => self.cancel(event.provider, provider_subscription_id).await,
            EventKind::Unrecognized => {
                info!("Ignoring unrecognized provider event");
                Ok(ReconcileOutcome::Ignored("unrecognized event type"))
            }
        }
    }

    async fn activate(
        &self,
        provider: PaymentProvider,
        activation: &SubscriptionActivation,
        now: DateTime<Utc>,
    ) -> AppResult<ReconcileOutcome> {
        let Some(plan) = self.catalog.resolve(&activation.plan_reference) else {
            error!(
                user_id = %activation.user_id,
                plan_reference = %activation.plan_reference,
                provider_subscription_id = %activation.provider_subscription_id,
                "Activation references a plan missing from the catalog"
            );
            return Ok(ReconcileOutcome::Ignored("plan not in catalog"));
        };

        let existing = self.subscriptions.get_by_user(activation.user_id).await?;
        let same_remote = existing.as_ref().filter(|s| {
            s.provider == provider
                && s.provider_reference() == Some(activation.provider_subscription_id.as_str())
        });

        let status = SubscriptionStatus::after_activation(
            existing.as_ref().map(|s| (s.status, same_remote.is_some())),
            activation.status,
        );
        if let Some(current) = same_remote
            && !status.grants_access()
        {
            warn!(
                user_id = %activation.user_id,
                subscription_id = %current.id,
                current_status = %current.status,
                incoming_status = %activation.status,
                "Late activation for a closed subscription left unchanged"
            );
            return Ok(ReconcileOutcome::Ignored("subscription already closed"));
        }

        let (trial_start, trial_end) = match (status, same_remote) {
            (SubscriptionStatus::Trialing, _) => {
                let start = same_remote
                    .and_then(|s| s.trial_start)
                    .or(activation.started_at)
                    .unwrap_or(now);
                (Some(start), Some(trial::trial_end(start)))
            }
            (_, Some(current)) => (current.trial_start, current.trial_end),
            (_, None) => (None, None),
        };

        let provider_customer_id = activation
            .provider_customer_id
            .clone()
            .or_else(|| same_remote.and_then(|s| s.provider_customer_id.clone()));

        let subscription = self
            .subscriptions
            .upsert(&SubscriptionUpsert {
                user_id: activation.user_id,
                plan_id: plan.id.to_string(),
                provider,
                provider_subscription_id: Some(activation.provider_subscription_id.clone()),
                provider_customer_id,
                status,
                trial_start,
                trial_end,
            })
            .await?;

        info!(
            user_id = %subscription.user_id,
            subscription_id = %subscription.id,
            status = %subscription.status,
            plan_id = %subscription.plan_id,
            "Subscription activated"
        );
        Ok(ReconcileOutcome::Activated(subscription))
    }

    async fn change_plan(
        &self,
        provider: PaymentProvider,
        provider_subscription_id: &str,
        plan_reference: &str,
    ) -> AppResult<ReconcileOutcome> {
        let subscription = self
            .find_by_remote(provider, provider_subscription_id)
            .await?;

        let Some(plan) = self.catalog.resolve(plan_reference) else {
            error!(
                subscription_id = %subscription.id,
                plan_reference,
                "Plan change references a plan missing from the catalog"
            );
            return Ok(ReconcileOutcome::Ignored("plan not in catalog"));
        };

        if subscription.plan_id == plan.id {
            return Ok(ReconcileOutcome::Ignored("plan unchanged"));
        }

        let updated = self.subscriptions.set_plan(subscription.id, plan.id).await?;
        info!(
            subscription_id = %updated.id,
            from_plan = %subscription.plan_id,
            to_plan = plan.id,
            "Subscription plan changed"
        );
        Ok(ReconcileOutcome::PlanChanged(updated))
    }

    async fn record_payment(
        &self,
        provider: PaymentProvider,
        payment: &PaymentSucceeded,
    ) -> AppResult<ReconcileOutcome> {
        let subscription = self
            .find_by_remote(provider, &payment.provider_subscription_id)
            .await?;

        let amount = match &payment.amount {
            Some(amount) => amount.clone(),
            None => self
                .catalog
                .resolve(&subscription.plan_id)
                .map(|plan| plan.price())
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "Cannot price payment {} for plan '{}'",
                        payment.provider_payment_id, subscription.plan_id
                    ))
                })?,
        };

        let inserted = self
            .payments
            .insert_if_absent(&NewPayment {
                subscription_id: subscription.id,
                provider,
                provider_payment_id: payment.provider_payment_id.clone(),
                amount,
                status: PaymentStatus::Succeeded,
            })
            .await?;

        let subscription = match subscription.status.after_payment() {
            None => {
                warn!(
                    subscription_id = %subscription.id,
                    provider_payment_id = %payment.provider_payment_id,
                    "Payment received for a canceled subscription; status left unchanged"
                );
                subscription
            }
            Some(next) if next != subscription.status => {
                self.subscriptions.set_status(subscription.id, next).await?
            }
            Some(_) => subscription,
        };

        info!(
            subscription_id = %subscription.id,
            provider_payment_id = %payment.provider_payment_id,
            duplicate = !inserted,
            "Payment reconciled"
        );
        Ok(ReconcileOutcome::PaymentRecorded {
            subscription,
            duplicate: !inserted,
        })
    }

    async fn cancel(
        &self,
        provider: PaymentProvider,
        provider_subscription_id: &str,
    ) -> AppResult<ReconcileOutcome> {
        let subscription = self
            .find_by_remote(provider, provider_subscription_id)
            .await?;

        if subscription.status == SubscriptionStatus::Canceled {
            return Ok(ReconcileOutcome::Canceled(subscription));
        }

        let updated = self
            .subscriptions
            .set_status(subscription.id, SubscriptionStatus::Canceled)
            .await?;
        info!(subscription_id = %updated.id, "Subscription canceled");
        Ok(ReconcileOutcome::Canceled(updated))
    }

    /// Missing rows are a 404 so the provider redelivers; events can arrive
    /// before the activation they depend on.
    async fn find_by_remote(
        &self,
        provider: PaymentProvider,
        provider_subscription_id: &str,
    ) -> AppResult<Subscription> {
        self.subscriptions
            .get_by_provider_subscription_id(provider, provider_subscription_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "No subscription for {} subscription {provider_subscription_id}",
                    provider.display_name()
                ))
            })
    }
}
