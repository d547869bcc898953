use clap::Parser;
use flightbox::config::Config;
use flightbox::log_format::TargetFirstFormat;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_logging(config.log_file.as_deref());

    info!("flightbox starting up");

    let shutdown = CancellationToken::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_termination().await;
        info!("shutdown signal received, notifying tasks");
        signal_shutdown.cancel();
    });

    if let Err(e) = flightbox::supervisor::run(config, shutdown).await {
        error!("fatal error during startup: {e:#}");
        std::process::exit(1);
    }
}

/// Configures `tracing` with a target-before-span-context event format, an
/// `RUST_LOG`-driven filter, and an optional mirrored file sink.
fn init_logging(log_file: Option<&std::path::Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).event_format(TargetFirstFormat);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .unwrap_or_else(|e| panic!("failed to open log file {path:?}: {e}"));
            subscriber.with_writer(std::sync::Mutex::new(file)).init();
        }
        None => subscriber.init(),
    }
}

/// Waits for SIGTERM (or SIGINT on non-Unix) so the supervisor can drain
/// cleanly (external termination triggers sentinel propagation through the
/// hub) rather than exit immediately on a hard kill.
async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received ctrl-c");
    }
}
