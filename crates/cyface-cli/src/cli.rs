//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cyface")]
#[command(author, version, about = "Inspect and export captured measurements", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding the database and sensor files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all measurements, newest first
    Measurements {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show one measurement with its tracks, distance and ascent
    Show {
        /// Measurement id
        id: i64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write the transfer file of a measurement
    Export {
        /// Measurement id
        id: i64,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,

        /// Write the uncompressed file even if compression is configured
        #[arg(long)]
        no_compress: bool,
    },

    /// Finish measurements left open by a capture that never stopped
    Recover,

    /// Open the database and apply pending schema migrations
    Migrate,

    /// Print the device identifier, creating it if needed
    DeviceId,

    /// Delete a measurement with all its data and sensor files
    Delete {
        /// Measurement id
        id: i64,
    },
}
