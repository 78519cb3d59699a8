//! Expense Capture - Main entry point
//!
//! Runs capture as a daemon. Device events arrive on stdin as JSON lines,
//! accepted expense events leave on stdout as JSON lines, logs go to stderr.

use expense_capture::{
    CaptureRouter, ChannelNotificationStream, Config, DeviceFeed, EventSink, InMemoryMessageStore,
};
use phone_server::{PhoneServer, StartOutcome, StubExpenseStore};
use std::io::Write;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Expense Capture");
    info!("Configuration path {:?}", Config::default_config_path());

    if !config.general.enabled {
        info!("Capture is disabled in configuration, exiting");
        return Ok(());
    }

    let (sink, mut events) = EventSink::channel(config.capture.channel_capacity);

    let stream = Arc::new(ChannelNotificationStream::new());
    let store = Arc::new(InMemoryMessageStore::new());
    let feed = DeviceFeed::new(stream.feed(), Arc::clone(&store));

    let router = CaptureRouter::new(&config, stream, store, sink);
    router.start();

    let server = PhoneServer::new(&config.server, Arc::new(StubExpenseStore));
    if config.server.enabled {
        match server.start(config.server.port).await {
            Ok(StartOutcome::Started(info)) => info!("Phone server listening on {}", info.url),
            Ok(StartOutcome::AlreadyRunning) => {}
            // The API is optional; capture keeps running without it
            Err(e) => error!("Phone server failed to start: {}", e),
        }
    }

    // Forward accepted events to the host
    let forwarder = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    let mut stdout = std::io::stdout().lock();
                    if writeln!(stdout, "{}", line).and_then(|_| stdout.flush()).is_err() {
                        warn!("Host closed stdout, stopping event forwarder");
                        break;
                    }
                }
                Err(e) => error!("Failed to encode {}: {}", event.name(), e),
            }
        }
    });

    // Keeps serving after stdin closes; only a signal ends the daemon
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutting down..."),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    };
    let applied = feed.run(BufReader::new(tokio::io::stdin()), shutdown).await;
    info!("Applied {} device event(s)", applied);

    router.shutdown();
    match server.stop().await {
        Ok(outcome) => info!("{}", outcome),
        Err(e) => error!("{}", e),
    }

    // Dropping the router releases the last sink so the forwarder drains and exits
    drop(router);
    drop(feed);
    if let Err(e) = forwarder.await {
        error!("Event forwarder failed: {}", e);
    }

    Ok(())
}
