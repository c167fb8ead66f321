use dotenvy::dotenv;
use tracing::info;

use dosetrack::infra::{
    app::create_app,
    setup::{init_app_state, init_tracing},
    trial_sweeper::run_trial_sweep_loop,
};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    // Before state setup so startup migrations and config warnings are logged
    init_tracing();

    let app_state = init_app_state().await?;

    let bind_addr = app_state.config.bind_addr;

    let app = create_app(app_state.clone());

    let use_cases = app_state.subscription_use_cases.clone();
    let sweep_every = app_state.config.trial_sweep_interval_secs;
    tokio::spawn(async move {
        run_trial_sweep_loop(use_cases, sweep_every).await;
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
