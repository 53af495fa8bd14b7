//! Mock language model for testing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{LanguageModel, LlmError};

enum Reply {
    Text(String),
    Fail(String),
}

/// Deterministic model that replays scripted answers.
///
/// When the script runs out it answers `"<prefix> <n>"` where `n` counts
/// calls from 1. Every prompt it receives is recorded.
pub struct MockModel {
    prefix: String,
    script: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            prefix: "Answer".to_string(),
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Answer the given texts in order.
    pub fn scripted<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::new();
        for answer in answers {
            model.push_answer(answer);
        }
        model
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sleep before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_answer(&self, answer: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Reply::Text(answer.into()));
        }
    }

    /// Queue a failing call.
    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Reply::Fail(message.into()));
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let call = {
            let mut prompts = self
                .prompts
                .lock()
                .map_err(|e| LlmError::Api(e.to_string()))?;
            prompts.push(prompt.to_string());
            prompts.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .script
            .lock()
            .map_err(|e| LlmError::Api(e.to_string()))?
            .pop_front();
        match next {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(LlmError::Api(message)),
            None => Ok(format!("{} {}", self.prefix, call)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_then_counter() {
        let model = MockModel::scripted(["Merlot"]);
        assert_eq!(model.generate("p1").await.unwrap(), "Merlot");
        assert_eq!(model.generate("p2").await.unwrap(), "Answer 2");
        assert_eq!(model.prompts(), vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_failure() {
        let model = MockModel::new();
        model.push_failure("boom");
        assert!(matches!(model.generate("p").await, Err(LlmError::Api(m)) if m == "boom"));
        assert_eq!(model.calls(), 1);
    }
}
