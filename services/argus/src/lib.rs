//! Argus - Observatory device monitoring service
//!
//! Polls ASCOM Alpaca devices and serves their latest state as a JSON API.

pub mod config;
pub mod engine;
pub mod error;
pub mod poller;
pub mod state;
pub mod status;

#[cfg(test)]
mod testutil;

pub use config::{load_config, Config};
pub use error::{ArgusError, Result};

use tokio_util::sync::CancellationToken;

use crate::engine::Engine;

/// Run the argus service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let status_port = config.service.status_port;

    let mut engine = Engine::new(config);
    engine.start().await;

    // Setup shutdown handler
    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    tracing::info!("Argus started");

    // Serve the status API (blocks until cancelled); tear the engine down
    // even if serving fails.
    let served = status::serve(engine.registry(), status_port, cancel.clone()).await;

    engine.shutdown().await;
    tracing::info!("Argus stopped");

    served
}
