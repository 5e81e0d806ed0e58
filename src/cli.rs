use crate::config::Mode;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "dockup",
    about = "Keep Dockerfile base images and release downloads up to date",
    version,
    author
)]
pub struct Cli {
    /// Path to the directory to scan for Dockerfiles (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    pub path: String,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip paths matching these globs, relative to the scanned directory
    #[arg(
        long,
        value_name = "GLOB",
        env = "DOCKUP_IGNORE",
        value_delimiter = ',',
        global = true
    )]
    pub ignore: Vec<String>,

    /// Pin images to their sha256 digest, recording the tag in a comment
    #[arg(long, env = "DOCKUP_SHA_PINNING", global = true)]
    pub sha_pinning: bool,

    /// What to extract from Dockerfiles
    #[arg(long, value_enum, default_value_t = Mode::Images, global = true)]
    pub mode: Mode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Update dependencies in every Dockerfile
    Update {
        /// Enable interactive mode to review updates before applying
        #[arg(short, long)]
        interactive: bool,

        /// Only consider versions with the same major version
        #[arg(long)]
        same_major: bool,
    },

    /// Check for available dependency updates without applying them
    Check {
        /// Only consider versions with the same major version
        #[arg(long)]
        same_major: bool,
    },

    /// List all dependencies found in Dockerfiles
    List,
}
