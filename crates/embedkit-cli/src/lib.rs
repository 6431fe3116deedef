//! embedkit CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    engine_config, index_corpus, load_corpus, load_settings, parse_vector, run, search_corpus,
    CorpusRecord,
};
