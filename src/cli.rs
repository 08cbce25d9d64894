use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "liveops")]
#[command(author, version, about = "Live streaming channel lifecycle automation")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Delete a live event and everything attached to it
    Teardown {
        /// Live event name
        #[arg(required = true)]
        channel: String,

        /// Keep recorded assets and their streaming policies
        #[arg(long)]
        keep_assets: bool,

        /// Region suffix selecting the media account
        #[arg(long)]
        region: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the stored metadata record of a live event
    Metadata {
        /// Live event name
        #[arg(required = true)]
        channel: String,

        /// Region suffix selecting the media account
        #[arg(long)]
        region: Option<String>,

        /// Record the live event's current state before showing it
        #[arg(long)]
        refresh: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
