//! Core domain types for sqlcoach.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the workspace: the service clients
//! decode into these types and the engine stores own values of them.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod chat;
mod identity;
mod ids;
mod problem;
mod query;

pub use chat::{AssistantReply, ChatMessage, ChatTurn, Exchange, Intent, Speaker, TurnSnapshot};
pub use identity::{Identity, IdentityPayload, Role};
pub use ids::{MessageId, ProblemId};
pub use problem::{CatalogFilter, Difficulty, FALLBACK_QUERY, Problem, SchemaRef, sort_catalog};
pub use query::{
    CHAT_PREVIEW_ROWS, Cell, ExecutionOutcome, Grade, QueryError, QueryResult, ResultPreview,
    SubmissionOutcome,
};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// NonEmptyString
// ============================================================================

/// A string guaranteed to be non-empty (after trimming).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("message content must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::ops::Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// ============================================================================
// Data Source
// ============================================================================

/// Which backing data source serves catalog and detail requests.
///
/// The layout's demo toggle maps `false` to [`DataSource::Mock`] and `true` to
/// [`DataSource::Demo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Mock,
    Demo,
}

impl DataSource {
    #[must_use]
    pub const fn from_demo(demo: bool) -> Self {
        if demo { DataSource::Demo } else { DataSource::Mock }
    }

    #[must_use]
    pub const fn is_demo(self) -> bool {
        matches!(self, DataSource::Demo)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DataSource::Mock => "mock",
            DataSource::Demo => "demo",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Layout Flags
// ============================================================================

/// Independent panel visibility and mode toggles.
///
/// No invariant couples the fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFlags {
    pub sidebar_visible: bool,
    pub chat_visible: bool,
    pub demo_mode: bool,
}

impl Default for LayoutFlags {
    fn default() -> Self {
        Self {
            sidebar_visible: true,
            chat_visible: true,
            demo_mode: false,
        }
    }
}

impl LayoutFlags {
    #[must_use]
    pub const fn data_source(&self) -> DataSource {
        DataSource::from_demo(self.demo_mode)
    }
}
