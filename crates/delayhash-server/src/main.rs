#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use delayhash::{
    InFlightTracker, SharedShutdown, ShutdownCoordinator, ShutdownOutcome, SubmissionService,
};
use server::config::{CliArgs, ServerConfig};
use server::service::handler::{AppState, router};
use server::signal::{Interrupts, forward_interrupts};
use server::telemetry::init_telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Exit status when a repeated interrupt cuts the drain short.
const FORCED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let inflight = InFlightTracker::new();
    let shutdown = ShutdownCoordinator::shared(inflight.clone(), config.shutdown_timeout);
    let service = SubmissionService::new(config.hash_delay, inflight, shutdown.admission_token());

    let interrupts = Interrupts::install()?;
    let listener = TcpListener::bind(config.server_addr).await?;
    log_startup_info(&listener.local_addr()?.to_string(), &config);

    tokio::spawn(forward_interrupts(interrupts.into_stream(), Arc::clone(&shutdown)));
    let server = tokio::spawn(serve(listener, AppState::new(service, Arc::clone(&shutdown))));

    let outcome = shutdown.run().await;
    // Connections still open at this point are abandoned along with any
    // computation that missed the timeout.
    server.abort();

    match forced_exit_code(outcome) {
        // No exporter flush: it can block for the full exporter timeout.
        Some(code) => {
            tracing::error!("Terminating without draining");
            std::process::exit(code);
        }
        None => {
            tracing::info!(?outcome, "Service shut down");
            providers.shutdown();
            Ok(())
        }
    }
}

/// Exit status for outcomes that bypass the graceful exit path.
fn forced_exit_code(outcome: ShutdownOutcome) -> Option<i32> {
    match outcome {
        ShutdownOutcome::Forced => Some(FORCED_EXIT_CODE),
        ShutdownOutcome::Drained | ShutdownOutcome::TimedOut => None,
    }
}

/// Serves HTTP until admission closes. A server failure triggers shutdown so
/// the drain still runs.
async fn serve(listener: TcpListener, state: AppState) {
    let shutdown: SharedShutdown = Arc::clone(&state.shutdown);
    let admission = shutdown.admission_token();

    tracing::info!("Serving HTTP requests");
    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(admission.cancelled_owned())
        .await;

    match result {
        Ok(()) => tracing::info!("Stopped accepting HTTP requests"),
        Err(e) => {
            tracing::error!("HTTP server failed: {e}");
            shutdown.request_shutdown();
        }
    }
}

fn log_startup_info(addr: &str, config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting hash service on {} with full config: {:#?}",
            addr,
            config
        );
    } else {
        tracing::info!(
            "Starting hash service on {} (hash delay {:?}, shutdown timeout {:?})",
            addr,
            config.hash_delay,
            config.shutdown_timeout
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_escalation_skips_the_graceful_exit() {
        assert_eq!(forced_exit_code(ShutdownOutcome::Forced), Some(130));
        assert_eq!(forced_exit_code(ShutdownOutcome::Drained), None);
        assert_eq!(forced_exit_code(ShutdownOutcome::TimedOut), None);
    }
}
