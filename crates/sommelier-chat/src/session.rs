//! The interactive retrieval-augmented conversation loop.
//!
//! Each accepted line walks `AwaitingInput -> Searching -> Prompting ->
//! InvokingModel -> AppendingContext -> AwaitingInput`. A failed search or
//! model call reports the error and goes straight back to `AwaitingInput`
//! without touching the context. EOF or `exit` ends the session.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use sommelier_types::Settings;
use sommelier_vector::{SearchHit, VectorError, VectorStore};

use crate::context::ConversationContext;
use crate::error::ChatError;
use crate::format::{to_summary_lines, to_text, DisplayFields};
use crate::model::LanguageModel;
use crate::prompt::{PromptTemplate, TokenCounter};

/// Input that ends the session, compared case-insensitively after trimming.
pub const EXIT_SENTINEL: &str = "exit";

/// Source of search hits for a question.
pub trait Retriever: Send + Sync {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, VectorError>;
}

/// Searches one collection of a shared, read-only store.
pub struct StoreRetriever {
    store: Arc<VectorStore>,
    collection: String,
}

impl StoreRetriever {
    pub fn new(store: Arc<VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }
}

impl Retriever for StoreRetriever {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, VectorError> {
        self.store.search(&self.collection, query, k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Searching,
    Prompting,
    InvokingModel,
    AppendingContext,
    Ended,
}

/// What one call to [`ChatSession::step`] did.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Full turn; carries the model's answer
    Answered(String),
    SearchFailed(ChatError),
    ModelFailed(ChatError),
    /// Blank line, nothing happened
    Skipped,
    Ended,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub theme: String,
    pub search_limit: usize,
    pub search_timeout: Duration,
    pub model_timeout: Duration,
    /// Render window for the context, 0 = all turns
    pub max_turns: usize,
    pub display: DisplayFields,
    /// Warn above this many prompt tokens, 0 = never
    pub prompt_token_warning: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            theme: "wine".to_string(),
            search_limit: 3,
            search_timeout: Duration::from_secs(10),
            model_timeout: Duration::from_secs(120),
            max_turns: 0,
            display: DisplayFields::default(),
            prompt_token_warning: 6000,
        }
    }
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            theme: settings.chatbot.theme.clone(),
            search_limit: settings.vectordb.search_limit,
            search_timeout: Duration::from_millis(settings.chatbot.search_timeout_ms),
            model_timeout: Duration::from_millis(settings.chatbot.model_timeout_ms),
            max_turns: settings.chatbot.max_turns,
            display: DisplayFields::default(),
            prompt_token_warning: settings.chatbot.prompt_token_warning,
        }
    }
}

pub struct ChatSession {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn LanguageModel>,
    template: PromptTemplate,
    context: ConversationContext,
    config: SessionConfig,
    tokens: TokenCounter,
    state: SessionState,
    transitions: Vec<SessionState>,
}

impl ChatSession {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        model: Arc<dyn LanguageModel>,
        template: PromptTemplate,
        config: SessionConfig,
    ) -> Self {
        Self {
            retriever,
            model,
            template,
            context: ConversationContext::with_max_turns(config.max_turns),
            config,
            tokens: TokenCounter::new(),
            state: SessionState::AwaitingInput,
            transitions: vec![SessionState::AwaitingInput],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state entered so far, starting with `AwaitingInput`.
    pub fn transitions(&self) -> &[SessionState] {
        &self.transitions
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn welcome_line(&self) -> String {
        format!(
            "Welcome to the local {} chatbot! Type '{}' to quit.",
            self.config.theme, EXIT_SENTINEL
        )
    }

    fn enter(&mut self, state: SessionState) {
        debug!(from = ?self.state, to = ?state, "Session transition");
        self.state = state;
        self.transitions.push(state);
    }

    /// Run until EOF or the exit sentinel.
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> Result<(), ChatError> {
        writeln!(output, "{}", self.welcome_line())?;
        info!(theme = %self.config.theme, model = self.model.name(), "Session started");

        let mut buf = Vec::new();
        while self.state != SessionState::Ended {
            write!(output, "You: ")?;
            output.flush()?;

            buf.clear();
            let read = input.read_until(b'\n', &mut buf)?;
            // invalid UTF-8 becomes U+FFFD
            let line = String::from_utf8_lossy(&buf);
            let next = if read == 0 { None } else { Some(line.as_ref()) };
            self.step(next, &mut output).await?;
        }

        info!(turns = self.context.len(), "Session ended");
        Ok(())
    }

    /// Process one line of input; `None` means end of input.
    ///
    /// Errors are reserved for the output stream; search and model failures
    /// come back as outcomes.
    pub async fn step<W: Write>(
        &mut self,
        line: Option<&str>,
        output: &mut W,
    ) -> Result<TurnOutcome, ChatError> {
        if self.state == SessionState::Ended {
            return Ok(TurnOutcome::Ended);
        }

        let input = match line.map(str::trim) {
            None => {
                self.enter(SessionState::Ended);
                return Ok(TurnOutcome::Ended);
            }
            Some(text) if text.eq_ignore_ascii_case(EXIT_SENTINEL) => {
                self.enter(SessionState::Ended);
                return Ok(TurnOutcome::Ended);
            }
            Some("") => return Ok(TurnOutcome::Skipped),
            Some(text) => text.to_string(),
        };

        self.enter(SessionState::Searching);
        let hits = match self.search(&input).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Search failed");
                writeln!(output, "Error: {}", e)?;
                self.enter(SessionState::AwaitingInput);
                return Ok(TurnOutcome::SearchFailed(e));
            }
        };

        self.enter(SessionState::Prompting);
        let results_text = to_text(&hits, &self.config.display);
        let prompt = self
            .template
            .assemble(&self.context.render(), &results_text, &input);
        let tokens = self
            .tokens
            .warn_if_over(&prompt, self.config.prompt_token_warning);
        debug!(tokens, hits = hits.len(), "Prompt assembled");

        self.enter(SessionState::InvokingModel);
        let answer = match self.invoke(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Model call failed");
                writeln!(output, "Error: {}", e)?;
                self.enter(SessionState::AwaitingInput);
                return Ok(TurnOutcome::ModelFailed(e));
            }
        };

        self.enter(SessionState::AppendingContext);
        self.context.append_turn(input.as_str(), answer.as_str());

        writeln!(output)?;
        writeln!(output, "Search results for '{}':", input)?;
        writeln!(output)?;
        for summary in to_summary_lines(&hits) {
            writeln!(output, "{}", summary)?;
        }
        writeln!(output)?;
        writeln!(output, "Chatbot: {}", answer)?;

        self.enter(SessionState::AwaitingInput);
        Ok(TurnOutcome::Answered(answer))
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ChatError> {
        let retriever = Arc::clone(&self.retriever);
        let query = query.to_string();
        let k = self.config.search_limit;
        let budget = self.config.search_timeout;

        let task = tokio::task::spawn_blocking(move || retriever.retrieve(&query, k));
        match tokio::time::timeout(budget, task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join)) => Err(ChatError::Io(std::io::Error::other(join))),
            Err(_) => Err(ChatError::Timeout {
                operation: "search",
                after_ms: budget.as_millis() as u64,
            }),
        }
    }

    async fn invoke(&self, prompt: &str) -> Result<String, ChatError> {
        let budget = self.config.model_timeout;
        match tokio::time::timeout(budget, self.model.generate(prompt)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ChatError::Timeout {
                operation: "model call",
                after_ms: budget.as_millis() as u64,
            }),
        }
    }
}
