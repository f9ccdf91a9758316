//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "arkassist",
    version,
    author = "neur0map",
    about = "Repository assistant that answers questions and suggests commands",
    long_about = "arkassist indexes the documentation of a repository, trains a small local \
                  embedding model on it, and answers free-text questions with the most relevant \
                  passages and the best matching commands. No external search service is used."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/arkassist/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Configuration profile to apply (e.g., "quick")
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the assistant model on the corpus
    Train(TrainArgs),

    /// Ask the assistant a question
    Ask {
        /// Question to ask
        question: String,

        /// Number of supporting passages to return
        #[arg(short = 'n', long)]
        top_chunks: Option<usize>,

        /// Number of command suggestions to return
        #[arg(long)]
        top_commands: Option<usize>,

        /// Command catalog file (TOML with [[commands]] entries)
        #[arg(long, value_name = "FILE")]
        commands: Option<PathBuf>,

        /// Show the reply in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show information about the trained model
    Info {
        /// Show information in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for the `[training]` and `[corpus]` configuration sections
#[derive(clap::Args, Debug, Default)]
pub struct TrainArgs {
    /// Corpus root directory
    #[arg(long, value_name = "DIR")]
    pub corpus: Option<PathBuf>,

    /// Where to write the model artifact
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of training epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Size of the embedding (hidden layer)
    #[arg(long)]
    pub hidden_size: Option<usize>,

    /// Mini-batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Maximum characters per chunk
    #[arg(long)]
    pub max_chars: Option<usize>,

    /// Minimum corpus frequency for a token to enter the vocabulary
    #[arg(long)]
    pub min_frequency: Option<usize>,

    /// Index at most this many chunks (useful for quick trial runs)
    #[arg(long)]
    pub max_chunks: Option<usize>,

    /// Gradient descent learning rate
    #[arg(long)]
    pub learning_rate: Option<f32>,

    /// Seed for weight initialization and shuffling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Show the summary in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
