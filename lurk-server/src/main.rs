//! Lurker Race Server
//!
//! Runs one race for a chat audience. Chat lines arrive on stdin as
//! `<user>: <message>`, outbound packets and chat replies leave on stdout.

mod config;
mod relay;
mod session;
mod shutdown;

use clap::Parser;
use config::ConfigLoader;
use relay::{outbound_channel, run_writer};
use session::RaceSession;
use shutdown::shutdown_signal;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Lurker Race - event-driven race minigame for stream chat
#[derive(Parser, Debug)]
#[command(name = "lurk-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./lurk-config.toml")]
    config: PathBuf,

    /// Override the tick interval in seconds
    #[arg(short, long)]
    tick_interval: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    tracing::info!("Starting lurk-server v{}", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::new(&args.config, args.tick_interval)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!(
        tick_interval_secs = config.tick_interval.as_secs(),
        points_per_tick = config.points_per_tick,
        "Configuration loaded from {:?}",
        args.config
    );

    let (outbound_tx, outbound_rx) = outbound_channel();
    let writer = tokio::spawn(run_writer(outbound_rx, tokio::io::stdout()));

    let session = RaceSession::new(config, outbound_tx);
    let result = session
        .run(BufReader::new(tokio::io::stdin()), shutdown_signal())
        .await;
    tracing::info!(
        racers = session.registry().len(),
        active = session.registry().active_racers().len(),
        items_on_field = session.field().item_count(),
        "Race session finished"
    );

    // Dropping the session drops the relays' senders, which lets the writer
    // drain and stop.
    drop(session);
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Failed to write outbound packets: {}", e),
        Err(e) => tracing::error!("Outbound writer task failed: {}", e),
    }

    if let Err(e) = &result {
        tracing::error!("Race session ended with an error: {}", e);
    }

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// Logs go to stderr; stdout carries the outbound packets.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt.json()).init();
    } else {
        registry.with(fmt).init();
    }
}
