//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Motion Sentinel - classify pointer streams as human or macro input
#[derive(Parser, Debug)]
#[command(name = "motion-sentinel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a recorded point session
    Replay {
        /// Session file to replay
        input: PathBuf,

        /// Model weights artifact (overrides config)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Scaler artifact (overrides config)
        #[arg(long)]
        scaler: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify JSONL point records from stdin in real time
    Stream {
        /// Model weights artifact (overrides config)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Scaler artifact (overrides config)
        #[arg(long)]
        scaler: Option<PathBuf>,
    },

    /// Check model and scaler artifacts against the configured schema
    Validate {
        /// Model weights artifact (overrides config)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Scaler artifact (overrides config)
        #[arg(long)]
        scaler: Option<PathBuf>,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "detector.seq_len")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "detector.base_threshold")
        key: String,

        /// Value to set
        value: String,
    },

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Directory holding config and artifacts
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".motion_sentinel"))
            .unwrap_or_else(|| PathBuf::from(".motion_sentinel"))
    }

    /// Directory holding recorded sessions
    pub fn sessions_dir() -> PathBuf {
        Self::data_dir().join("sessions")
    }
}
