//! Prompt templates with validated named slots.

use thiserror::Error;
use tracing::warn;

/// Body used when only a preamble is configured.
pub const DEFAULT_BODY: &str = "Here is the conversation history: {context}\n\n\
Here are the search results: {search_results}\n\n\
Question: {question}\n\n\
Answer:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Template is missing the {{{0}}} slot")]
    MissingSlot(&'static str),

    #[error("Template uses the {{{0}}} slot more than once")]
    DuplicateSlot(&'static str),

    #[error("Template has unknown slot {{{0}}}")]
    UnknownSlot(String),
}

/// The three values filled in on every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Context,
    SearchResults,
    Question,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Context, Slot::SearchResults, Slot::Question];

    pub fn name(self) -> &'static str {
        match self {
            Slot::Context => "context",
            Slot::SearchResults => "search_results",
            Slot::Question => "question",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Slot::ALL.into_iter().find(|s| s.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Slot(Slot),
}

/// Immutable, validated prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    version: u32,
    preamble: String,
    parts: Vec<Part>,
}

impl PromptTemplate {
    /// Parse `body`; it must hold each slot exactly once and nothing else in braces
    /// that looks like a slot name.
    pub fn new(
        version: u32,
        preamble: impl Into<String>,
        body: &str,
    ) -> Result<Self, TemplateError> {
        let parts = parse_body(body)?;
        for slot in Slot::ALL {
            let uses = parts.iter().filter(|p| **p == Part::Slot(slot)).count();
            match uses {
                0 => return Err(TemplateError::MissingSlot(slot.name())),
                1 => {}
                _ => return Err(TemplateError::DuplicateSlot(slot.name())),
            }
        }
        Ok(Self {
            version,
            preamble: preamble.into(),
            parts,
        })
    }

    /// Version 1 template: `initial_template` with `{theme}` expanded, then the default body.
    pub fn for_theme(initial_template: &str, theme: &str) -> Result<Self, TemplateError> {
        Self::new(1, initial_template.replace("{theme}", theme), DEFAULT_BODY)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Fill every slot. Values are inserted as-is.
    pub fn assemble(&self, context: &str, search_results: &str, question: &str) -> String {
        let mut out = String::with_capacity(
            self.preamble.len() + context.len() + search_results.len() + question.len() + 128,
        );
        let preamble = self.preamble.trim_end();
        if !preamble.is_empty() {
            out.push_str(preamble);
            out.push_str("\n\n");
        }
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Slot(Slot::Context) => out.push_str(context),
                Part::Slot(Slot::SearchResults) => out.push_str(search_results),
                Part::Slot(Slot::Question) => out.push_str(question),
            }
        }
        out
    }
}

fn is_slot_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_body(body: &str) -> Result<Vec<Part>, TemplateError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = body;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after.find('}').filter(|&end| is_slot_name(&after[..end]));
        match close {
            Some(end) => {
                let name = &after[..end];
                let slot = Slot::from_name(name)
                    .ok_or_else(|| TemplateError::UnknownSlot(name.to_string()))?;
                literal.push_str(&rest[..open]);
                if !literal.is_empty() {
                    parts.push(Part::Literal(std::mem::take(&mut literal)));
                }
                parts.push(Part::Slot(slot));
                rest = &after[end + 1..];
            }
            None => {
                // not a slot, keep the brace
                literal.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(Part::Literal(literal));
    }
    Ok(parts)
}

/// Approximate prompt size in tokens.
pub struct TokenCounter {
    bpe: Option<tiktoken_rs::CoreBPE>,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter {
    pub fn new() -> Self {
        Self {
            bpe: tiktoken_rs::cl100k_base().ok(),
        }
    }

    /// cl100k token count, or roughly four characters per token without it.
    pub fn count(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => (text.len() / 4).max(1),
        }
    }

    /// Log a warning when `prompt` exceeds `limit` tokens. Zero disables the check.
    pub fn warn_if_over(&self, prompt: &str, limit: usize) -> usize {
        let tokens = self.count(prompt);
        if limit > 0 && tokens > limit {
            warn!(tokens, limit, "Prompt exceeds token warning threshold");
        }
        tokens
    }
}
