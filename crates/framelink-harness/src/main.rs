//! Framelink simulation binary.
//!
//! Runs one channel between two simulated frames and reports the outcome.
//!
//! # Usage
//!
//! ```bash
//! # Fragment handshake, five messages
//! framelink-sim --messages 5
//!
//! # Native primitive, custom origins, handshake tracing
//! framelink-sim --native --source-origin https://app.example \
//!     --target-origin https://widget.example --log-level debug
//! ```

use clap::Parser;
use framelink_core::ChannelMode;
use framelink_harness::{Scenario, ScenarioConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Framelink channel simulator
#[derive(Parser, Debug)]
#[command(name = "framelink-sim")]
#[command(about = "Simulate a framelink channel between two frames")]
#[command(version)]
struct Args {
    /// Origin of the initiating top frame
    #[arg(long, default_value = "https://a.example")]
    source_origin: String,

    /// Origin of the target frame
    #[arg(long, default_value = "https://b.example")]
    target_origin: String,

    /// Declared name of the target frame
    #[arg(long, default_value = "frame-b")]
    target_name: String,

    /// Messages to send after the handshake
    #[arg(short, long, default_value = "3")]
    messages: usize,

    /// RNG seed for identities and nonces
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Use the native messaging primitive instead of relays
    #[arg(long)]
    native: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mode = if args.native { ChannelMode::Native } else { ChannelMode::Fragment };
    let config = ScenarioConfig {
        source_origin: args.source_origin,
        target_origin: args.target_origin,
        target_name: args.target_name,
        messages: args.messages,
        seed: args.seed,
        mode,
    };

    tracing::info!(?mode, seed = config.seed, "simulation starting");

    let outcome = Scenario::with_config(config).run()?;

    tracing::info!(
        channel = %outcome.channel,
        ready = outcome.is_ready(),
        delivered = outcome.received().len(),
        rejected = outcome.world.rejections().len(),
        "simulation finished"
    );

    for event in outcome.received() {
        tracing::info!(origin = %event.origin, data = %event.data, "message delivered");
    }

    for rejection in outcome.world.rejections() {
        tracing::warn!(%rejection, "relay event discarded");
    }

    Ok(())
}
