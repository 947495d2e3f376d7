use clap::Subcommand;
use std::io::Write;

use crate::track::TrackClient;

/// Recorded track subcommands
#[derive(Subcommand, Debug)]
pub enum TrackCommands {
    /// Print recorded track points
    Show {
        /// Only print the most recent points
        #[arg(short, long)]
        last: Option<usize>,
    },

    /// Delete the recorded track on the ground station
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl TrackCommands {
    /// Execute the track command
    pub async fn execute(self, client: &TrackClient) -> anyhow::Result<()> {
        match self {
            TrackCommands::Show { last } => {
                let points = client.fetch().await?;

                if points.is_empty() {
                    println!("No track points recorded.");
                    return Ok(());
                }

                let skip = last.map_or(0, |n| points.len().saturating_sub(n));

                println!("{:<6} {:>12} {:>13}", "#", "Latitude", "Longitude");
                println!("{}", "-".repeat(33));
                for (i, (lat, lon)) in points.iter().enumerate().skip(skip) {
                    println!("{:<6} {:>12.7} {:>13.7}", i + 1, lat, lon);
                }
                println!();
                println!("Total: {} points", points.len());
            }

            TrackCommands::Clear { force } => {
                if !force {
                    print!("Delete the recorded track at {}? [y/N] ", client.url());
                    std::io::stdout().flush()?;

                    let mut input = String::new();
                    std::io::stdin().read_line(&mut input)?;
                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Cancelled.");
                        return Ok(());
                    }
                }

                client.clear().await?;
                println!("✅ Track cleared.");
            }
        }

        Ok(())
    }
}
