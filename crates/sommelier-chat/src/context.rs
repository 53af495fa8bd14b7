//! Conversation history for one session.

/// One exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

/// Append-only turn log.
///
/// `max_turns` only limits how many recent turns [`render`](Self::render)
/// emits; the log itself keeps everything.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    turns: Vec<Turn>,
    max_turns: Option<usize>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render at most the last `max_turns` turns. Zero means unbounded.
    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: (max_turns > 0).then_some(max_turns),
        }
    }

    pub fn append_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(Turn {
            user: user.into(),
            assistant: assistant.into(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn render(&self) -> String {
        let skip = match self.max_turns {
            Some(max) => self.turns.len().saturating_sub(max),
            None => 0,
        };
        self.turns[skip..]
            .iter()
            .map(|t| format!("\nYou: {}\nChatbot: {}", t.user, t.assistant))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_renders_empty() {
        assert_eq!(ConversationContext::new().render(), "");
    }

    #[test]
    fn test_render_in_order() {
        let mut ctx = ConversationContext::new();
        ctx.append_turn("hi", "hello");
        ctx.append_turn("red?", "Merlot");
        assert_eq!(ctx.render(), "\nYou: hi\nChatbot: hello\nYou: red?\nChatbot: Merlot");
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_window_limits_render_only() {
        let mut ctx = ConversationContext::with_max_turns(2);
        for i in 0..4 {
            ctx.append_turn(format!("q{i}"), format!("a{i}"));
        }
        let rendered = ctx.render();
        assert!(!rendered.contains("q1"));
        assert!(rendered.starts_with("\nYou: q2"));
        assert_eq!(ctx.len(), 4);
        assert_eq!(ctx.turns()[0].user, "q0");
    }

    #[test]
    fn test_zero_window_is_unbounded() {
        let mut ctx = ConversationContext::with_max_turns(0);
        for i in 0..5 {
            ctx.append_turn(format!("q{i}"), "a");
        }
        assert!(ctx.render().contains("q0"));
    }
}
