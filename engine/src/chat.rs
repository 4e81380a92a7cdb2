//! Tutor conversation.

use sqlcoach_services::ServiceError;
use sqlcoach_types::{
    AssistantReply, ChatMessage, ChatTurn, Exchange, MessageId, NonEmptyString, TurnSnapshot,
};

/// Assistant text appended when the tutor request fails.
pub const FALLBACK_REPLY: &str = "Error contacting AI";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChatTicket {
    pub message_id: MessageId,
    pub turn: ChatTurn,
}

/// Append-only conversation with at most one request in flight.
#[derive(Debug, Default)]
pub struct ChatEngine {
    messages: Vec<ChatMessage>,
    draft: String,
    next_id: u64,
}

impl ChatEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.messages.iter().any(ChatMessage::is_pending)
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a user message and compose its request.
    ///
    /// Ignored when the text is blank, a request is already pending, or there
    /// is no resolved problem to ask about.
    pub(crate) fn send(&mut self, text: &str, snapshot: Option<TurnSnapshot>) -> Option<ChatTicket> {
        if self.is_pending() {
            tracing::debug!("Chat request already pending; ignoring send");
            return None;
        }
        let Ok(text) = NonEmptyString::new(text) else {
            return None;
        };
        let Some(snapshot) = snapshot else {
            tracing::debug!("No problem loaded; ignoring send");
            return None;
        };

        let turn = ChatTurn::new(&text, snapshot);
        let message_id = self.allocate_id();
        self.messages.push(ChatMessage::user(message_id, text));
        self.draft.clear();
        Some(ChatTicket { message_id, turn })
    }

    pub(crate) fn send_draft(&mut self, snapshot: Option<TurnSnapshot>) -> Option<ChatTicket> {
        let draft = self.draft.clone();
        self.send(&draft, snapshot)
    }

    /// Merge a tutor response into the conversation. Returns whether it was applied.
    pub(crate) fn apply_reply(
        &mut self,
        message_id: MessageId,
        result: Result<AssistantReply, ServiceError>,
    ) -> bool {
        let Some(message) = self
            .messages
            .iter_mut()
            .find(|message| message.id() == message_id && message.is_pending())
        else {
            tracing::debug!(%message_id, "Ignoring reply for a settled message");
            return false;
        };

        let reply = match result {
            Ok(reply) => {
                message.settle(Exchange::Resolved);
                Some(reply)
            }
            Err(e) => {
                tracing::warn!(%message_id, "Tutor request failed: {e}");
                message.settle(Exchange::Failed);
                None
            }
        };

        let id = self.allocate_id();
        self.messages.push(match reply {
            Some(reply) => ChatMessage::assistant(id, reply),
            None => ChatMessage::fallback(id, FALLBACK_REPLY),
        });
        true
    }
}
