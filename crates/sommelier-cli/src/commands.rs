//! Command implementations.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use sommelier_chat::{
    to_mapping, to_summary_lines, ApiModel, ApiModelConfig, ChatSession, DisplayFields,
    PromptTemplate, SessionConfig, StoreRetriever,
};
use sommelier_ingest::CsvLoader;
use sommelier_types::Settings;
use sommelier_vector::VectorStore;

const RULE: &str = "----------------------------------------";

/// CLI values that override loaded settings.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub data: Option<String>,
    pub limit: Option<usize>,
}

/// Load configuration (defaults -> files -> env) and apply CLI overrides last.
pub fn load_settings(config_path: Option<&str>, overrides: &Overrides) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    apply_overrides(&mut settings, overrides)?;
    Ok(settings)
}

pub fn apply_overrides(settings: &mut Settings, overrides: &Overrides) -> Result<()> {
    if let Some(level) = &overrides.log_level {
        settings.log_level = level.clone();
    }
    if let Some(data) = &overrides.data {
        settings.data = data.clone();
    }
    if let Some(limit) = overrides.limit {
        settings.vectordb.search_limit = limit;
    }
    settings.validate().context("Invalid configuration")?;
    Ok(())
}

/// Initialize logging on stderr so stdout carries only chat output.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Load the dataset and build the configured collection.
///
/// Fails if the dataset cannot be read or the build yields no points.
pub fn prepare_store(settings: &Settings) -> Result<VectorStore> {
    let data_path = settings.data_path();
    let documents = CsvLoader::new()
        .with_drop_if_empty(settings.vectordb.required_field.as_str())
        .load_path(&data_path)
        .with_context(|| format!("Failed to load dataset {}", data_path.display()))?;

    let mut store = VectorStore::from_settings(&settings.vectordb, settings.model_cache_dir())
        .context("Failed to initialize vector store")?;

    let collection = settings.vectordb.collection_name.as_str();
    store
        .build_collection(collection, &documents)
        .with_context(|| format!("Failed to build collection '{}'", collection))?;

    Ok(store)
}

pub fn run_build<W: Write>(settings: &Settings, out: &mut W) -> Result<()> {
    let store = prepare_store(settings)?;
    report_build(&store, settings, out)
}

fn report_build<W: Write>(store: &VectorStore, settings: &Settings, out: &mut W) -> Result<()> {
    let stats = store.stats(&settings.vectordb.collection_name)?;
    writeln!(
        out,
        "Collection '{}' contains {} points.",
        stats.name, stats.points_count
    )?;
    Ok(())
}

pub fn run_search<W: Write>(
    settings: &Settings,
    query: &str,
    text: bool,
    out: &mut W,
) -> Result<()> {
    let store = prepare_store(settings)?;
    search_store(&store, settings, query, text, out)
}

/// Print one search against an already built store.
pub fn search_store<W: Write>(
    store: &VectorStore,
    settings: &Settings,
    query: &str,
    text: bool,
    out: &mut W,
) -> Result<()> {
    let hits = store.search(
        &settings.vectordb.collection_name,
        query,
        settings.vectordb.search_limit,
    )?;

    writeln!(out, "{}", RULE)?;
    writeln!(out, "Search results for '{}':", query)?;
    writeln!(out, "{}", RULE)?;
    if text {
        writeln!(
            out,
            "{}",
            to_mapping(&hits, &DisplayFields::default()).to_indented_text()
        )?;
    } else {
        for line in to_summary_lines(&hits) {
            writeln!(out, "{}", line)?;
        }
    }
    writeln!(out, "{}", RULE)?;
    Ok(())
}

/// Build the index, then talk on stdin/stdout until EOF or `exit`.
pub async fn run_chat(settings: &Settings) -> Result<()> {
    let store = prepare_store(settings)?;
    report_build(&store, settings, &mut std::io::stderr())?;

    let chatbot = &settings.chatbot;
    let template = PromptTemplate::for_theme(&chatbot.initial_template, &chatbot.theme)
        .context("Invalid prompt template")?;
    let model = ApiModel::new(ApiModelConfig::from_settings(chatbot))
        .context("Failed to create model client")?;
    info!(model = %chatbot.llm_model, provider = ?chatbot.provider, "Model client ready");

    let retriever = StoreRetriever::new(Arc::new(store), settings.vectordb.collection_name.clone());
    let mut session = ChatSession::new(
        Arc::new(retriever),
        Arc::new(model),
        template,
        SessionConfig::from_settings(settings),
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    session.run(stdin.lock(), stdout.lock()).await?;
    Ok(())
}
