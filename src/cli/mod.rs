//! CLI module for Elytra
//!
//! Provides command-line interface parsing for the elytra-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod chat;
pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Elytra - AI Study-Abroad Counseling Server
///
/// Serves program records, student profiles and retrieval-augmented program
/// recommendations over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "elytra-server",
    author = "Elytra Team <dev@elytra.app>",
    version,
    about = "Elytra - AI Study-Abroad Counseling Server",
    long_about = "Stores academic programs and student profiles, answers program questions\n\
                  through retrieval-augmented chat, and relays counselor meeting requests.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a new project.",
    after_help = "EXAMPLES:\n    \
                  elytra-server init                      # Scaffold elytra.toml and .env.example\n    \
                  elytra-server                           # Start the server (requires elytra.toml)\n    \
                  elytra-server index                     # Push every program into the vector index\n    \
                  elytra-server chat --server http://127.0.0.1:3000 --token $TOKEN"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "elytra.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Initialize a new Elytra project with configuration files
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Completion provider to configure (gemini or openai)
        #[arg(long, default_value = "gemini")]
        provider: String,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,
    },

    /// Show configuration information
    Config {
        /// Show the full configuration
        #[arg(short = 'f', long)]
        full: bool,

        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Interactive counselor chat in the terminal
    Chat {
        /// Base URL of a running server; omit to call the providers directly
        #[arg(long)]
        server: Option<String>,

        /// Session token for the server
        #[arg(long, env = "ELYTRA_TOKEN")]
        token: Option<String>,
    },

    /// Embed every stored program and upsert it into the vector index
    Index,

    /// Issue a session token (operators and local testing)
    Token {
        /// Subject (user id)
        #[arg(long)]
        sub: String,

        /// Email claim
        #[arg(long)]
        email: String,

        /// Role claim (student or admin)
        #[arg(long, default_value = "student")]
        role: String,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
