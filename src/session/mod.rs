pub mod controller;
pub mod store;

use crate::api::models::{Conversation, Message};

pub use controller::ChatController;
pub use store::ConversationList;

pub const BACKEND_FALLBACK: &str = "Sorry, I encountered an error. Please try again.";
pub const TRANSPORT_FALLBACK: &str =
    "Sorry, I couldn't connect to the server. Please check your internet connection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// `success: false` or a response without data.
    Backend,
    /// The request failed or the response could not be read.
    Transport,
}

impl FailureKind {
    pub fn fallback_text(self) -> &'static str {
        match self {
            FailureKind::Backend => BACKEND_FALLBACK,
            FailureKind::Transport => TRANSPORT_FALLBACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Replied { conversation_id: String },
    Failed(FailureKind),
    Rejected(RejectReason),
}

/// In-memory state of the open conversation.
///
/// Messages only grow while a send is in flight; switching conversations
/// replaces them wholesale and bumps `epoch`.
#[derive(Debug, Default, Clone)]
pub struct ActiveSession {
    conversation_id: Option<String>,
    messages: Vec<Message>,
    loading: bool,
    epoch: u64,
    fresh_reply: Option<usize>,
}

impl ActiveSession {
    pub fn reset(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
        self.fresh_reply = None;
        self.epoch += 1;
    }

    pub fn open(&mut self, id: String, conversation: Conversation) {
        self.conversation_id = Some(id);
        self.messages = conversation.messages;
        self.fresh_reply = None;
        self.epoch += 1;
    }

    fn push_user(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn push_reply(&mut self, message: Message) {
        self.messages.push(message);
        self.fresh_reply = Some(self.messages.len() - 1);
    }

    /// The id is assigned once per session and never overwritten.
    fn adopt_id(&mut self, id: &str) {
        if self.conversation_id.is_none() {
            self.conversation_id = Some(id.to_string());
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            conversation_id: self.conversation_id.clone(),
            messages: self.messages.clone(),
            loading: self.loading,
            epoch: self.epoch,
            fresh_reply: self.fresh_reply,
        }
    }
}

/// Point-in-time copy of the session handed to renderers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub conversation_id: Option<String>,
    pub messages: Vec<Message>,
    pub loading: bool,
    pub epoch: u64,
    /// Index of the reply most recently appended by a send in this session.
    pub fresh_reply: Option<usize>,
}
