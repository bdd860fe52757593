use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many of the most recent turns are sent to the model as memory.
pub const CONTEXT_WINDOW_TURNS: usize = 5;

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// "user" or "assistant".
    pub role: String,
    /// The message content.
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An ordered, append-only sequence of conversation turns for one session.
///
/// The underlying sequence is unbounded; only the read-side window is capped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a conversation from already-ordered turns.
    pub fn from_turns(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }

    /// Append a turn at the end.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// The last `n` turns in chronological order (all of them when fewer).
    ///
    /// The window for a prompt must be taken AFTER appending the new user
    /// turn, so the model sees the just-submitted message as the most recent
    /// entry.
    pub fn recent_window(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}

/// A structured message for the completion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "user" or "assistant".
    pub role: String,
    /// The message content.
    pub content: String,
}

/// Conversation context passed to a completion provider.
///
/// `turns` is the already-windowed slice of the conversation, ending with the
/// current user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// System prompt prepended to every request.
    pub system_prompt: String,
    /// Windowed turns, oldest first.
    pub turns: Vec<ConversationTurn>,
}

impl Context {
    /// Build a context from a conversation: window the most recent turns.
    pub fn from_conversation(system_prompt: String, conversation: &Conversation) -> Self {
        Self {
            system_prompt,
            turns: conversation.recent_window(CONTEXT_WINDOW_TURNS).to_vec(),
        }
    }

    /// Convert to structured API messages.
    ///
    /// Returns `(system_prompt, messages)` — the system prompt is kept
    /// separate so the provider can place it according to its wire format.
    pub fn to_api_messages(&self) -> (String, Vec<ApiMessage>) {
        let messages = self
            .turns
            .iter()
            .map(|t| ApiMessage {
                role: t.role.clone(),
                content: t.content.clone(),
            })
            .collect();
        (self.system_prompt.clone(), messages)
    }
}
