//! Configuration loading for sommelier.
//!
//! Layered config, later sources win:
//! defaults -> ~/.config/sommelier/config.{toml,yaml} -> --config file
//! -> SOMMELIER_* env vars -> CLI flags (applied by the caller).

use ::config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// What `create_collection` does when the collection already exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RebuildPolicy {
    /// Drop the existing collection and start empty
    #[default]
    Recreate,
    /// Refuse with `CollectionExists`
    FailIfExists,
}

/// Language-model API flavour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum Provider {
    /// Local Ollama server (`/api/generate`)
    #[default]
    #[serde(rename = "ollama")]
    Ollama,
    /// Any OpenAI-compatible `/chat/completions` endpoint
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Ollama => "http://localhost:11434",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }
}

/// Vector index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbSettings {
    /// Embedding model id: a Hugging Face repo, a short sentence-transformers
    /// name, or `hash[:dim]` for the offline encoder
    #[serde(default = "default_encoder_model")]
    pub encoder_model: String,

    /// `:memory:` for the exact in-memory index, otherwise a directory for
    /// the HNSW index snapshot
    #[serde(default = "default_instance_mode")]
    pub instance_mode: String,

    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Document field that gets embedded
    #[serde(default = "default_text_source")]
    pub text_source: String,

    /// Rows with this field empty are dropped at load time
    #[serde(default = "default_required_field")]
    pub required_field: String,

    #[serde(default)]
    pub rebuild_policy: RebuildPolicy,

    /// Documents per encoder call during a build
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Hits retrieved per query (k)
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Override for the model file cache directory
    #[serde(default)]
    pub model_cache_dir: Option<String>,
}

fn default_encoder_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_instance_mode() -> String {
    ":memory:".to_string()
}

fn default_collection_name() -> String {
    "top_wines".to_string()
}

fn default_text_source() -> String {
    "notes".to_string()
}

fn default_required_field() -> String {
    "variety".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_search_limit() -> usize {
    3
}

impl Default for VectorDbSettings {
    fn default() -> Self {
        Self {
            encoder_model: default_encoder_model(),
            instance_mode: default_instance_mode(),
            collection_name: default_collection_name(),
            text_source: default_text_source(),
            required_field: default_required_field(),
            rebuild_policy: RebuildPolicy::default(),
            batch_size: default_batch_size(),
            search_limit: default_search_limit(),
            model_cache_dir: None,
        }
    }
}

impl VectorDbSettings {
    /// True when the index lives purely in memory.
    pub fn is_in_memory(&self) -> bool {
        self.instance_mode == ":memory:"
    }
}

/// Chatbot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotSettings {
    /// Topic shown in the welcome line and available as `{theme}` in the preamble
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Persona/instruction preamble placed before the prompt body
    #[serde(default = "default_initial_template")]
    pub initial_template: String,

    /// Model name passed to the provider (e.g. "llama3.1", "gpt-4o-mini")
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    #[serde(default)]
    pub provider: Provider,

    /// API base URL (provider default when unset)
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// API key (set via SOMMELIER_CHATBOT__API_KEY, not stored in config files)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Most recent turns rendered into the prompt; 0 renders the whole history
    #[serde(default)]
    pub max_turns: usize,

    /// Budget for one whole model call, retries included
    #[serde(default = "default_model_timeout_ms")]
    pub model_timeout_ms: u64,

    /// Timeout for a single HTTP attempt; must leave room for retries
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    /// Attempts per model call, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Log a warning once an assembled prompt exceeds this many tokens
    #[serde(default = "default_prompt_token_warning")]
    pub prompt_token_warning: usize,
}

fn default_theme() -> String {
    "wine".to_string()
}

fn default_initial_template() -> String {
    "You are a friendly {theme} expert. Answer the question using the search \
     results and the conversation history. If the search results do not \
     contain the answer, say so instead of guessing."
        .to_string()
}

fn default_llm_model() -> String {
    "llama3.1".to_string()
}

fn default_model_timeout_ms() -> u64 {
    120_000
}

fn default_request_timeout_ms() -> u64 {
    40_000
}

fn default_search_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_prompt_token_warning() -> usize {
    6_000
}

impl Default for ChatbotSettings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            initial_template: default_initial_template(),
            llm_model: default_llm_model(),
            provider: Provider::default(),
            api_base_url: None,
            api_key: None,
            max_turns: 0,
            model_timeout_ms: default_model_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            search_timeout_ms: default_search_timeout_ms(),
            max_retries: default_max_retries(),
            prompt_token_warning: default_prompt_token_warning(),
        }
    }
}

impl ChatbotSettings {
    /// Configured base URL or the provider default.
    pub fn base_url(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the CSV dataset
    #[serde(default = "default_data_path")]
    pub data: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub vectordb: VectorDbSettings,

    #[serde(default)]
    pub chatbot: ChatbotSettings,
}

fn default_data_path() -> String {
    "data/top_rated_wines.csv".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data: default_data_path(),
            log_level: default_log_level(),
            vectordb: VectorDbSettings::default(),
            chatbot: ChatbotSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/sommelier/config.toml or .yaml)
    /// 3. CLI-specified config file (optional, must exist)
    /// 4. Environment variables (SOMMELIER_*, `__` between nested keys)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from("", "", "sommelier")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("data", default_data_path())?
            .set_default("log_level", default_log_level())?
            .set_default("vectordb.encoder_model", default_encoder_model())?
            .set_default("vectordb.instance_mode", default_instance_mode())?
            .set_default("vectordb.collection_name", default_collection_name())?
            .set_default("chatbot.theme", default_theme())?
            .set_default("chatbot.llm_model", default_llm_model())?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // e.g. SOMMELIER_DATA, SOMMELIER_VECTORDB__COLLECTION_NAME
        builder = builder.add_source(
            Environment::with_prefix("SOMMELIER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would only fail later, mid-session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.data.trim().is_empty() {
            return invalid("data path must not be empty");
        }
        if self.vectordb.collection_name.trim().is_empty() {
            return invalid("vectordb.collection_name must not be empty");
        }
        if self.vectordb.encoder_model.trim().is_empty() {
            return invalid("vectordb.encoder_model must not be empty");
        }
        if self.vectordb.text_source.trim().is_empty() {
            return invalid("vectordb.text_source must not be empty");
        }
        if self.vectordb.batch_size == 0 {
            return invalid("vectordb.batch_size must be > 0");
        }
        if self.vectordb.search_limit == 0 {
            return invalid("vectordb.search_limit must be > 0");
        }
        if self.chatbot.llm_model.trim().is_empty() {
            return invalid("chatbot.llm_model must not be empty");
        }
        if self.chatbot.model_timeout_ms == 0
            || self.chatbot.search_timeout_ms == 0
            || self.chatbot.request_timeout_ms == 0
        {
            return invalid("chatbot timeouts must be > 0");
        }
        if self.chatbot.request_timeout_ms >= self.chatbot.model_timeout_ms {
            return invalid("chatbot.request_timeout_ms must be below chatbot.model_timeout_ms");
        }
        if self.chatbot.max_retries == 0 {
            return invalid("chatbot.max_retries must be >= 1");
        }
        Ok(())
    }

    /// Dataset path with a leading `~/` expanded.
    pub fn data_path(&self) -> PathBuf {
        expand_home(&self.data)
    }

    /// Model cache directory, if overridden.
    pub fn model_cache_dir(&self) -> Option<PathBuf> {
        self.vectordb.model_cache_dir.as_deref().map(expand_home)
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
