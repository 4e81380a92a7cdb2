//! Tutor conversation types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DataSource;
use crate::NonEmptyString;
use crate::ids::{MessageId, ProblemId};
use crate::query::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// How the tutor classified a turn. Unknown labels are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    DataQuery,
    Tutoring,
    Error,
    Other(String),
}

impl Intent {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Intent::DataQuery => "data_query",
            Intent::Tutoring => "tutoring",
            Intent::Error => "error",
            Intent::Other(label) => label,
        }
    }
}

impl From<String> for Intent {
    fn from(value: String) -> Self {
        match value.as_str() {
            "data_query" => Intent::DataQuery,
            "tutoring" => Intent::Tutoring,
            "error" => Intent::Error,
            _ => Intent::Other(value),
        }
    }
}

impl From<Intent> for String {
    fn from(value: Intent) -> Self {
        match value {
            Intent::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of the request a user message started.
///
/// Transitions: Pending -> Resolved | Failed. Never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Pending,
    Resolved,
    Failed,
}

/// Fields of a tutor reply, as delivered by the assistant collaborator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssistantReply {
    pub text: String,
    pub sql: Option<String>,
    pub result: Option<QueryResult>,
    pub executed: Option<bool>,
    pub intent: Option<Intent>,
    pub execution_error: Option<String>,
}

/// One entry of the append-only conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    id: MessageId,
    speaker: Speaker,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    executed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<Intent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    execution_error: Option<String>,
    /// Present on user messages only.
    #[serde(skip_serializing_if = "Option::is_none")]
    exchange: Option<Exchange>,
}

impl ChatMessage {
    #[must_use]
    pub fn user(id: MessageId, text: NonEmptyString) -> Self {
        Self {
            id,
            speaker: Speaker::User,
            text: text.into_inner(),
            sql: None,
            result: None,
            executed: None,
            intent: None,
            execution_error: None,
            exchange: Some(Exchange::Pending),
        }
    }

    #[must_use]
    pub fn assistant(id: MessageId, reply: AssistantReply) -> Self {
        let AssistantReply {
            text,
            sql,
            result,
            executed,
            intent,
            execution_error,
        } = reply;
        Self {
            id,
            speaker: Speaker::Assistant,
            text,
            sql,
            result,
            executed,
            intent,
            execution_error,
            exchange: None,
        }
    }

    /// Plain assistant message used when the tutor could not be reached.
    #[must_use]
    pub fn fallback(id: MessageId, text: impl Into<String>) -> Self {
        Self::assistant(
            id,
            AssistantReply {
                text: text.into(),
                ..AssistantReply::default()
            },
        )
    }

    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    #[must_use]
    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn executed(&self) -> Option<bool> {
        self.executed
    }

    #[must_use]
    pub fn intent(&self) -> Option<&Intent> {
        self.intent.as_ref()
    }

    #[must_use]
    pub fn execution_error(&self) -> Option<&str> {
        self.execution_error.as_deref()
    }

    #[must_use]
    pub fn exchange(&self) -> Option<Exchange> {
        self.exchange
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.exchange == Some(Exchange::Pending)
    }

    /// Settle a pending exchange. Returns false if the message was not pending.
    pub fn settle(&mut self, outcome: Exchange) -> bool {
        if !self.is_pending() || outcome == Exchange::Pending {
            return false;
        }
        self.exchange = Some(outcome);
        true
    }

    /// Whether an attached result should be rendered as a table.
    #[must_use]
    pub fn shows_result_table(&self) -> bool {
        self.executed == Some(true) && self.result.as_ref().is_some_and(|r| !r.is_empty())
    }
}

/// Session values captured when a chat request is composed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSnapshot {
    pub problem_id: ProblemId,
    pub code: String,
    pub last_error: Option<String>,
    pub mode: DataSource,
}

/// Everything the assistant collaborator receives for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub problem_id: ProblemId,
    pub message: String,
    pub code: String,
    pub last_error: Option<String>,
    pub mode: DataSource,
}

impl ChatTurn {
    #[must_use]
    pub fn new(message: &NonEmptyString, snapshot: TurnSnapshot) -> Self {
        let TurnSnapshot {
            problem_id,
            code,
            last_error,
            mode,
        } = snapshot;
        Self {
            problem_id,
            message: message.as_str().to_string(),
            code,
            last_error,
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Cell;

    #[test]
    fn intent_round_trips_known_and_unknown_labels() {
        let known: Intent = serde_json::from_str("\"data_query\"").unwrap();
        assert_eq!(known, Intent::DataQuery);
        let unknown: Intent = serde_json::from_str("\"smalltalk\"").unwrap();
        assert_eq!(unknown, Intent::Other("smalltalk".to_string()));
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"smalltalk\"");
    }

    #[test]
    fn user_message_settles_once() {
        let text = NonEmptyString::new("How many rows?").unwrap();
        let mut msg = ChatMessage::user(MessageId::new(0), text);
        assert!(msg.is_pending());
        assert!(msg.settle(Exchange::Resolved));
        assert!(!msg.settle(Exchange::Failed));
        assert_eq!(msg.exchange(), Some(Exchange::Resolved));
    }

    #[test]
    fn assistant_messages_carry_no_exchange() {
        let mut msg = ChatMessage::fallback(MessageId::new(1), "Error contacting AI");
        assert_eq!(msg.speaker(), Speaker::Assistant);
        assert_eq!(msg.exchange(), None);
        assert!(!msg.settle(Exchange::Resolved));
    }

    #[test]
    fn result_table_requires_executed_non_empty_result() {
        let result = QueryResult::new(vec!["n".to_string()], vec![vec![Cell::Int(3)]]);
        let reply = AssistantReply {
            text: "Query returned 1 result".to_string(),
            sql: Some("SELECT COUNT(*) AS n FROM employees".to_string()),
            result: Some(result),
            executed: Some(true),
            intent: Some(Intent::DataQuery),
            execution_error: None,
        };
        let msg = ChatMessage::assistant(MessageId::new(1), reply.clone());
        assert!(msg.shows_result_table());

        let not_run = ChatMessage::assistant(
            MessageId::new(2),
            AssistantReply {
                executed: Some(false),
                ..reply
            },
        );
        assert!(!not_run.shows_result_table());
    }
}
