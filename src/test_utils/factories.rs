//! Test data factories.
//!
//! Each factory returns a complete, valid object; the closure overrides fields.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    payment_provider::PaymentProvider,
    subscription::{Subscription, SubscriptionStatus},
    trial,
};

/// A trialing Square subscription on the basic plan, started at `test_datetime()`.
pub fn create_test_subscription(
    user_id: Uuid,
    overrides: impl FnOnce(&mut Subscription),
) -> Subscription {
    let started = test_datetime();
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        user_id,
        plan_id: "basic_monthly".to_string(),
        provider: PaymentProvider::Square,
        provider_subscription_id: Some("sq_sub_1".to_string()),
        provider_customer_id: Some("sq_cust_1".to_string()),
        status: SubscriptionStatus::Trialing,
        trial_start: Some(started),
        trial_end: Some(trial::trial_end(started)),
        created_at: started,
        updated_at: started,
    };
    overrides(&mut subscription);
    subscription
}

/// Fixed timestamp for reproducible fixtures.
pub fn test_datetime() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}
