//! embedkit
//!
//! Local embedding generation, model recommendation, and semantic search.
//!
//! # Usage
//!
//! ```bash
//! embedkit models [--category embedding]
//! embedkit detect
//! embedkit recommend [--category embedding]
//! embedkit embed "some text" [--model ID] [--strategy auto]
//! embedkit similarity "1,0,0" "0.9,0.1,0"
//! embedkit search "query" --corpus notes.json [-n 5] [--min-similarity 0.5]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/embedkit/config.toml)
//! 3. File given with --config
//! 4. Environment variables (EMBEDKIT_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use embedkit_cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
