use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::use_cases::subscription::SubscriptionUseCases;

/// Periodically expires trials that ran out without the user checking in.
pub async fn run_trial_sweep_loop(use_cases: Arc<SubscriptionUseCases>, interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));

    info!("Trial sweep started (every {}s)", interval_secs);

    loop {
        ticker.tick().await;

        match use_cases.sweep_expired_trials(Utc::now()).await {
            Ok(0) => debug!("No lapsed trials"),
            Ok(expired) => info!(expired, "Trial sweep finished"),
            Err(e) => error!(error = %e, "Trial sweep failed"),
        }
    }
}
