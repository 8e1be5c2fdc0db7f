// CoachSync gateway
// Serves the dashboard API by default; `sync-meetings <email>` runs one
// external-meetings sync against the backend from the command line.

use anyhow::{bail, Context, Result};
use coachsync::utils::logging::{self, init_logging};
use coachsync::{router, AppState, GatewayConfig, HttpCoachApi, SyncNotifier, SyncPoller};
use log::{error, info};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real deployments use the environment.
    let _ = dotenvy::dotenv();
    init_logging().context("Failed to initialize logging")?;

    let config = GatewayConfig::from_env()?;
    config.validate()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        None | Some("serve") => serve(config).await,
        Some("sync-meetings") => match args.get(1) {
            Some(email) => sync_meetings(config, email).await,
            None => Err(anyhow::anyhow!("Usage: coachsync sync-meetings <email>")),
        },
        Some(other) => bail!("Unknown command: {}", other),
    };

    if let Err(e) = &result {
        logging::log_error_with_context(e, "coachsync");
    }
    result
}

async fn serve(config: GatewayConfig) -> Result<()> {
    let port = config.port;
    let state = AppState::new(config)?;
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let address = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Gateway listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    info!("Gateway stopped");
    Ok(())
}

async fn sync_meetings(config: GatewayConfig, email: &str) -> Result<()> {
    let api = HttpCoachApi::backend(config.backend_url.clone(), email.to_string())?;
    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let poller = SyncPoller::new(Arc::new(api), SyncNotifier::new()).with_shutdown(shutdown);
    let outcome = poller.run_sync().await?;

    match outcome.error_message() {
        None => {
            info!("Sync {} completed", outcome.task_id());
            Ok(())
        }
        Some(message) => {
            error!("Sync {} did not complete: {}", outcome.task_id(), message);
            bail!(message)
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM and cancels `token`.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => {},
    }

    token.cancel();
}
