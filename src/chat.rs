use serde::{Deserialize, Serialize};

/// Assistant reply used when a chat turn fails for any reason. Failures are
/// absorbed into the transcript rather than raised as alerts.
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't reach the assistant. Please try sending that again.";

/// A chat message in the assistant conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender. Serialized lowercase to match the
/// backend's chatHistory entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Everything one turn sends to the backend besides the shared prompt:
/// the new message and the history recorded strictly before it.
#[derive(Debug)]
pub struct ChatTurn {
    pub message: String,
    pub history: Vec<ChatMessage>,
}

/// Append-only conversation state. Messages are never reordered or deleted;
/// turns are serialized (one outstanding request at a time).
#[derive(Debug, Default)]
pub struct ChatSession {
    pub messages: Vec<ChatMessage>,
    pending: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Submit a message: snapshot the prior history, append the user message
    /// optimistically, and mark the turn outstanding. Returns None (and
    /// appends nothing) for empty input or while a turn is in flight.
    pub fn submit(&mut self, text: &str) -> Option<ChatTurn> {
        let text = text.trim();
        if text.is_empty() || self.pending {
            return None;
        }

        let history = self.messages.clone();
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: text.to_string(),
        });
        self.pending = true;

        Some(ChatTurn {
            message: text.to_string(),
            history,
        })
    }

    /// Resolve the outstanding turn with exactly one assistant message:
    /// the response text, or the fixed fallback on failure.
    pub fn resolve(&mut self, result: Result<String, String>) {
        if !self.pending {
            return;
        }
        self.pending = false;

        let content = match result {
            Ok(reply) => reply,
            Err(_) => FALLBACK_REPLY.to_string(),
        };
        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_appends_user_message_and_snapshots_prior_history() {
        let mut session = ChatSession::new();
        let turn = session.submit("Hi").unwrap();

        assert_eq!(turn.message, "Hi");
        assert!(turn.history.is_empty());
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, ChatRole::User);
        assert_eq!(session.messages[0].content, "Hi");
    }

    #[test]
    fn history_excludes_the_submitted_message() {
        let mut session = ChatSession::new();
        session.submit("first").unwrap();
        session.resolve(Ok("reply".into()));

        let turn = session.submit("second").unwrap();
        assert_eq!(turn.history.len(), 2);
        assert_eq!(turn.history[0].content, "first");
        assert_eq!(turn.history[1].content, "reply");
    }

    #[test]
    fn failure_appends_the_fixed_fallback() {
        let mut session = ChatSession::new();
        session.submit("Hi").unwrap();
        session.resolve(Err("connection refused".into()));

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].role, ChatRole::Assistant);
        assert_eq!(session.messages[1].content, FALLBACK_REPLY);
    }

    #[test]
    fn exactly_one_assistant_message_per_turn() {
        let mut session = ChatSession::new();
        session.submit("Hi").unwrap();
        session.resolve(Ok("hello".into()));
        // A duplicate resolution has nothing outstanding to resolve.
        session.resolve(Ok("hello again".into()));

        assert_eq!(session.messages.len(), 2);
    }

    #[test]
    fn submissions_are_serialized_while_a_turn_is_outstanding() {
        let mut session = ChatSession::new();
        assert!(session.submit("one").is_some());
        assert!(session.is_pending());
        assert!(session.submit("two").is_none());
        assert_eq!(session.messages.len(), 1);

        session.resolve(Ok("reply".into()));
        assert!(session.submit("two").is_some());
    }

    #[test]
    fn empty_or_whitespace_input_is_refused() {
        let mut session = ChatSession::new();
        assert!(session.submit("").is_none());
        assert!(session.submit("   ").is_none());
        assert!(session.messages.is_empty());
        assert!(!session.is_pending());
    }

    #[test]
    fn transcript_is_never_reordered() {
        let mut session = ChatSession::new();
        session.submit("a").unwrap();
        session.resolve(Err("boom".into()));
        session.submit("b").unwrap();
        session.resolve(Ok("ok".into()));

        let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", FALLBACK_REPLY, "b", "ok"]);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage {
            role: ChatRole::Assistant,
            content: "hi".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
