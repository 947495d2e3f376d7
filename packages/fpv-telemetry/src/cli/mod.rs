mod track;

pub use track::TrackCommands;

use crate::config::ClientConfig;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

/// FPV Telemetry - ground station stream client and instrument monitor
#[derive(Parser)]
#[command(name = "fpv-telemetry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Command-line overrides applied on top of the environment
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// Ground station base URL (http, https, ws or wss)
    #[arg(short, long, global = true, env = "FPV_SERVER_URL")]
    pub server: Option<String>,

    /// Delay before reconnecting, in milliseconds
    #[arg(long, global = true)]
    pub reconnect_delay_ms: Option<u64>,

    /// Instrument tick period, in milliseconds
    #[arg(long, global = true)]
    pub tick_ms: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if let Some(ms) = self.reconnect_delay_ms {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.tick_ms {
            config.tick_interval = Duration::from_millis(ms);
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream telemetry and print instrument readouts (default)
    Watch {
        /// Seconds between console readouts
        #[arg(short, long, default_value = "1")]
        interval: u64,

        /// Skip loading the recorded track on startup
        #[arg(long)]
        no_history: bool,
    },

    /// Recorded track commands
    #[command(subcommand)]
    Track(TrackCommands),
}
