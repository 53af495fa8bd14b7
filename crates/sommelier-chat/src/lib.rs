//! # sommelier-chat
//!
//! The conversational half of sommelier: formats search hits, keeps the
//! turn history, assembles prompts and drives the question/answer loop
//! against a language model.

pub mod api;
pub mod context;
pub mod error;
pub mod format;
pub mod mock;
pub mod model;
pub mod prompt;
pub mod session;

pub use api::{ApiModel, ApiModelConfig};
pub use context::{ConversationContext, Turn};
pub use error::ChatError;
pub use format::{to_mapping, to_summary_lines, to_text, DisplayFields, ResultMap};
pub use mock::MockModel;
pub use model::{LanguageModel, LlmError};
pub use prompt::{PromptTemplate, Slot, TemplateError, TokenCounter, DEFAULT_BODY};
pub use session::{
    ChatSession, Retriever, SessionConfig, SessionState, StoreRetriever, TurnOutcome, EXIT_SENTINEL,
};
