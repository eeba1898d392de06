// CastBet Prediction Market Ledger - Main Entry Point
// Serves the market engine over HTTP; state is snapshotted to disk on Ctrl-C

use std::error::Error;
use tracing::{error, info, warn};

use castbet_ledger::{routes, AppState, Config, SharedState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    init_logging();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        owner = %config.owner,
        protocol_fee_bps = config.protocol_fee_bps,
        faucet_enabled = config.faucet_enabled,
        "starting CastBet prediction market ledger"
    );

    let mut app_state = AppState::new(config)?;
    match app_state.load_from_disk() {
        Ok(true) => info!("resumed from persisted state"),
        Ok(false) => info!("no persisted state found, starting fresh"),
        Err(e) => {
            warn!(error = %e, "persisted state unreadable, starting fresh");
        }
    }

    let bind_addr = app_state.config.bind_addr;
    let state: SharedState = app_state.shared();

    // Clone state for shutdown handler before moving into router
    let shutdown_state = state.clone();
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown signal received, saving state");
    match shutdown_state.lock() {
        Ok(app_state) => {
            if let Err(e) = app_state.save_to_disk() {
                error!(error = %e, "failed to save state");
            }
        }
        Err(_) => error!("state lock poisoned, snapshot skipped"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("castbet_ledger=info"));

    if std::env::var("CASTBET_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
