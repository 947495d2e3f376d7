use anyhow::Context;
use clap::Parser;
use fpv_telemetry::cli::{Cli, Commands};
use fpv_telemetry::motion::{AttitudeGeometry, TapeGeometry};
use fpv_telemetry::readout::summary_line;
use fpv_telemetry::{
    AttitudeIndicator, ClientConfig, FlightTrack, HeadingTape, MotionEngine, SnapshotHub,
    StreamSession, TrackClient,
};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fpv_telemetry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = ClientConfig::from_env().context("Failed to load configuration")?;
    cli.overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Some(Commands::Track(cmd)) => {
            let client = TrackClient::from_config(&config)?;
            cmd.execute(&client).await
        }
        Some(Commands::Watch {
            interval,
            no_history,
        }) => watch(config, Duration::from_secs(interval.max(1)), no_history).await,
        None => watch(config, Duration::from_secs(1), false).await,
    }
}

async fn watch(config: ClientConfig, readout_every: Duration, no_history: bool) -> anyhow::Result<()> {
    info!("🚀 Starting FPV telemetry client v{}", VERSION);
    info!("Ground station: {}", config.server_url);

    let hub = SnapshotHub::new();

    let history = if no_history {
        Vec::new()
    } else {
        load_history(&config).await
    };
    let track = FlightTrack::follow(&hub, history);

    let attitude = MotionEngine::follow(
        &hub,
        AttitudeIndicator::new(AttitudeGeometry::default(), config.smoothing_factor),
        config.tick_interval,
    );
    let heading = MotionEngine::follow(
        &hub,
        HeadingTape::new(TapeGeometry::default(), config.smoothing_factor),
        config.tick_interval,
    );

    let session = StreamSession::from_config(&config, hub.clone())?;
    info!("Streaming from {}", session.url());

    let mut readout = tokio::time::interval(readout_every);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                break;
            }

            _ = readout.tick() => {
                let latest = hub.latest();
                let mut line = summary_line(
                    session.status(),
                    hub.data_status(),
                    attitude.frame().as_ref(),
                    heading.frame().as_ref(),
                    latest.as_deref(),
                );
                if let Some((lat, lon)) = track.last() {
                    line.push_str(&format!(" pos={:.6},{:.6} track={}", lat, lon, track.len()));
                }
                info!("{}", line);
            }
        }
    }

    info!("Shutting down...");
    session.shutdown().await;
    attitude.shutdown().await;
    heading.shutdown().await;

    if let Some(home) = track.home() {
        info!("Home position: {:.7}, {:.7} ({:.1}m)", home.lat, home.lon, home.alt);
    }
    info!("✅ Stopped after {} connection attempts", session.connect_attempts());

    Ok(())
}

/// Recorded track points, or empty when the ground station has none to give
async fn load_history(config: &ClientConfig) -> Vec<(f64, f64)> {
    let client = match TrackClient::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            warn!("Track history unavailable: {}", e);
            return Vec::new();
        }
    };

    match client.fetch().await {
        Ok(points) => {
            info!("Loaded {} track points", points.len());
            points
        }
        Err(e) => {
            warn!("Failed to load track history: {}", e);
            Vec::new()
        }
    }
}
