//! # sommelier-types
//!
//! Shared domain types for the Sommelier retrieval chatbot.
//!
//! - [`Document`]: one row of the source dataset, the payload of every
//!   indexed record
//! - [`Settings`]: layered configuration (defaults, config files, env, CLI)
//! - [`ConfigError`]: startup configuration failures

pub mod config;
pub mod document;
pub mod error;

pub use crate::config::{
    expand_home, ChatbotSettings, Provider, RebuildPolicy, Settings, VectorDbSettings,
};
pub use crate::document::{Document, FieldValue};
pub use crate::error::ConfigError;
