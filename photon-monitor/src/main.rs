//! Launcher binary for the real-time detector monitor: parses CLI arguments,
//! loads the YAML configuration, wires `SIGINT` into the fabric's cancellation
//! token, and drives one run to completion (spec §4.8/§7).

use clap::Parser;
use photon_broadcast::BroadcastChannel;
use photon_config::ConfigTree;
use photon_core::{CancellationToken, PhotonError};
use photon_fabric::{run, AggregatorOutcome, RunConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

/// Printed once by rank 0 at startup, per spec §4.8/§6 (mirrors the original
/// monitor's own rank-0 banner).
const CITATION_BANNER: &str =
    "You are using an OM real-time monitor. Please cite: Mariani et al., \
     J Appl Crystallogr. 2016 May 23;49(Pt 3):1073-1080";

/// Real-time distributed monitor for streaming X-ray detector data.
#[derive(Debug, Parser)]
#[command(name = "photon-monitor", version, about)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, env = "PHOTON_CONFIG")]
    config: PathBuf,

    /// Total pool size, aggregator included (rank 0 is the aggregator, ranks
    /// 1..pool_size are workers).
    #[arg(long, default_value_t = 2)]
    pool_size: u32,

    /// Overrides `data_retrieval_layer.source_identifier`'s descriptor (a file
    /// list path, typically) without editing the config file.
    #[arg(long)]
    source: Option<String>,

    /// Address the BroadcastChannel listens on for subscriber connections.
    #[arg(long)]
    broadcast_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match launch(args).await {
        Ok(AggregatorOutcome::Done) => {
            tracing::info!("monitor shut down: run completed normally");
            ExitCode::SUCCESS
        }
        Ok(AggregatorOutcome::Shutdown) => {
            tracing::info!("monitor shut down: interrupted");
            ExitCode::FAILURE
        }
        Err(error) => {
            let rank = match &error {
                PhotonError::FatalWorker { rank, .. } => Some(*rank),
                _ => None,
            };
            tracing::error!("{}", error.diagnostic("photon-monitor", rank));
            tracing::info!("monitor shut down: fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn launch(args: Args) -> Result<AggregatorOutcome, PhotonError> {
    if args.pool_size < 2 {
        return Err(PhotonError::config(
            "pool_size must be at least 2 (one aggregator, one worker)",
        ));
    }

    let config = ConfigTree::load(&args.config).map_err(|cause| {
        PhotonError::config(format!("loading {}: {cause}", args.config.display()))
    })?;

    let broadcast_addr = args.broadcast_addr.unwrap_or_else(|| {
        photon_broadcast::DEFAULT_ENDPOINT
            .parse()
            .expect("DEFAULT_ENDPOINT is a valid socket address")
    });

    tracing::info!("{CITATION_BANNER}");

    let cancel = CancellationToken::new();
    let channel = BroadcastChannel::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("SIGINT received, initiating shutdown");
            signal_cancel.cancel();
        }
    });

    let broadcast_cancel = cancel.clone();
    let broadcast_channel = channel.clone();
    tokio::spawn(async move {
        if let Err(error) =
            photon_broadcast::serve(broadcast_channel, broadcast_addr, broadcast_cancel).await
        {
            tracing::error!(%error, "broadcast channel listener stopped");
        }
    });

    tracing::info!(
        pool_size = args.pool_size,
        %broadcast_addr,
        "Photon Fabric Monitor starting"
    );

    let report = run(
        &config,
        RunConfig {
            pool_size: args.pool_size,
            source_override: args.source,
        },
        channel,
        cancel,
    )
    .await?;

    tracing::info!(outcome = ?report.aggregator, "run finished");
    Ok(report.aggregator)
}
