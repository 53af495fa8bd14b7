//! Sommelier CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (chat, search, build)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    apply_overrides, init_logging, load_settings, prepare_store, run_build, run_chat, run_search,
    search_store, Overrides,
};
