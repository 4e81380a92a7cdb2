//! Problem catalog types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::ProblemId;

/// Code buffer contents when a problem ships without an initial query.
pub const FALLBACK_QUERY: &str = "SELECT 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The database schema a problem runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub display_name: String,
}

impl SchemaRef {
    #[must_use]
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            display_name: display_name.into(),
        }
    }
}

/// A single SQL exercise. Immutable once fetched.
///
/// Catalog listings omit `description` and `initial_query`; detail fetches carry both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: ProblemId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub schema: SchemaRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

impl Problem {
    /// Query text the code buffer is reset to when this problem loads.
    #[must_use]
    pub fn starting_query(&self) -> &str {
        self.initial_query
            .as_deref()
            .filter(|query| !query.trim().is_empty())
            .unwrap_or(FALLBACK_QUERY)
    }
}

/// Optional catalog filters. All fields absent means "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
    pub schema_id: Option<u64>,
}

impl CatalogFilter {
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() {
            None
        } else {
            Some(search)
        };
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema_id: u64) -> Self {
        self.schema_id = Some(schema_id);
        self
    }
}

/// Orders a catalog by `(order, id)`. Problems without an ordering key sort last.
pub fn sort_catalog(problems: &mut [Problem]) {
    problems.sort_by_key(|problem| (problem.order.is_none(), problem.order, problem.id));
}
