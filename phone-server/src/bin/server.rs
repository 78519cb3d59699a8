//! Standalone phone server binary
//!
//! Runs the local expense API on its own. The capture daemon embeds the
//! same server; this binary is for exercising the API without it.

use phone_server::{PhoneServer, ServerConfig, StartOutcome, StubExpenseStore};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ServerConfig::default();
    if let Ok(host) = std::env::var("PHONE_SERVER_HOST") {
        config.host = host;
    }
    if let Ok(port) = std::env::var("PHONE_SERVER_PORT") {
        match port.parse() {
            Ok(port) => config.port = port,
            Err(e) => warn!("Ignoring PHONE_SERVER_PORT={}: {}", port, e),
        }
    }

    let server = PhoneServer::new(&config, Arc::new(StubExpenseStore));

    match server.start(config.port).await {
        Ok(StartOutcome::Started(info)) => info!("Listening on {}", info.url),
        Ok(StartOutcome::AlreadyRunning) => {}
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    }

    info!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    let outcome = server.stop().await?;
    info!("{}", outcome);

    Ok(())
}
