use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the engines and serve the translation API
    Serve {
        /// Port the API listens on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Services file (overrides server.services_path)
        #[arg(short, long)]
        services: Option<PathBuf>,
    },

    /// List configured language pairs without launching engines
    Languages {
        /// Services file (overrides server.services_path)
        #[arg(short, long)]
        services: Option<PathBuf>,
    },

    /// Launch one pair's engine and translate text once
    Translate {
        /// Source language
        #[arg(short, long)]
        from: String,

        /// Target language
        #[arg(short, long)]
        to: String,

        /// Text to translate (read from stdin when omitted)
        #[arg(long)]
        text: Option<String>,

        /// Services file (overrides server.services_path)
        #[arg(short, long)]
        services: Option<PathBuf>,

        /// Attempts while the engine is still coming up
        #[arg(long, default_value = "30")]
        attempts: u32,
    },

    /// Write a default configuration file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}
