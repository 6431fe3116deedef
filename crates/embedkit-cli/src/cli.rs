//! CLI argument parsing for embedkit.
//!
//! Global flags override the layered configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use embedkit_types::{LoaderStrategy, ModelCategory};

/// Local embedding generation and semantic search
#[derive(Parser, Debug)]
#[command(name = "embedkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/embedkit/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List catalog models
    Models {
        /// Only models of this category (embedding, generative)
        #[arg(long)]
        category: Option<ModelCategory>,
    },

    /// Show detected device capabilities
    Detect,

    /// Rank compatible models for this device
    Recommend {
        /// Only models of this category (embedding, generative)
        #[arg(long)]
        category: Option<ModelCategory>,
    },

    /// Embed a text and print the vector
    Embed {
        /// Text to embed
        text: String,

        /// Catalog model id (default from config or recommendation)
        #[arg(short, long)]
        model: Option<String>,

        /// Engine strategy (auto, primary-only, fallback-only)
        #[arg(short, long)]
        strategy: Option<LoaderStrategy>,
    },

    /// Cosine similarity of two comma-separated vectors
    Similarity {
        /// First vector, e.g. "0.1,0.2,0.3"
        #[arg(allow_hyphen_values = true)]
        a: String,

        /// Second vector
        #[arg(allow_hyphen_values = true)]
        b: String,
    },

    /// Semantic search over a JSON corpus of {id, text} records
    Search {
        /// Query text
        query: String,

        /// Path to the corpus JSON file
        #[arg(long)]
        corpus: PathBuf,

        /// Maximum results (default from config)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Minimum similarity 0.0-1.0 (default from config)
        #[arg(long)]
        min_similarity: Option<f32>,

        /// Catalog model id
        #[arg(short, long)]
        model: Option<String>,

        /// Engine strategy (auto, primary-only, fallback-only)
        #[arg(short, long)]
        strategy: Option<LoaderStrategy>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_models_category() {
        let cli = Cli::parse_from(["embedkit", "models", "--category", "embedding"]);
        match cli.command {
            Commands::Models { category } => assert_eq!(category, Some(ModelCategory::Embedding)),
            _ => panic!("Expected Models command"),
        }
    }

    #[test]
    fn test_cli_bad_category_rejected() {
        assert!(Cli::try_parse_from(["embedkit", "models", "--category", "audio"]).is_err());
    }

    #[test]
    fn test_cli_detect() {
        let cli = Cli::parse_from(["embedkit", "detect"]);
        assert!(matches!(cli.command, Commands::Detect));
    }

    #[test]
    fn test_cli_embed_with_model_and_strategy() {
        let cli = Cli::parse_from([
            "embedkit",
            "embed",
            "hello world",
            "--model",
            "bge-small-en-v1.5",
            "--strategy",
            "fallback-only",
        ]);
        match cli.command {
            Commands::Embed {
                text,
                model,
                strategy,
            } => {
                assert_eq!(text, "hello world");
                assert_eq!(model.as_deref(), Some("bge-small-en-v1.5"));
                assert_eq!(strategy, Some(LoaderStrategy::FallbackOnly));
            }
            _ => panic!("Expected Embed command"),
        }
    }

    #[test]
    fn test_cli_similarity_negative_values() {
        let cli = Cli::parse_from(["embedkit", "similarity", "-1,0", "1,0"]);
        match cli.command {
            Commands::Similarity { a, b } => {
                assert_eq!(a, "-1,0");
                assert_eq!(b, "1,0");
            }
            _ => panic!("Expected Similarity command"),
        }
    }

    #[test]
    fn test_cli_search() {
        let cli = Cli::parse_from([
            "embedkit",
            "search",
            "rust ownership",
            "--corpus",
            "notes.json",
            "-n",
            "3",
            "--min-similarity",
            "0.4",
        ]);
        match cli.command {
            Commands::Search {
                query,
                corpus,
                limit,
                min_similarity,
                ..
            } => {
                assert_eq!(query, "rust ownership");
                assert_eq!(corpus, PathBuf::from("notes.json"));
                assert_eq!(limit, Some(3));
                assert_eq!(min_similarity, Some(0.4));
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_with_config_and_log_level() {
        let cli = Cli::parse_from([
            "embedkit",
            "--config",
            "/path/to/config.toml",
            "--log-level",
            "debug",
            "detect",
        ]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }
}
