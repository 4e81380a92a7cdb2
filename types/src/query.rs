//! Query execution payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rows shown inline for a result attached to a chat message.
pub const CHAT_PREVIEW_ROWS: usize = 5;

/// A single nullable scalar cell.
///
/// Integers are tried before floats so whole numbers keep their integer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("null"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Tabular result of a successful query.
///
/// `row_count` is what the evaluator reported and may exceed `rows.len()`
/// when the backend truncated the row set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub row_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

/// A bounded prefix of a [`QueryResult`] for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultPreview<'a> {
    pub columns: &'a [String],
    pub rows: &'a [Vec<Cell>],
    /// Rows not shown ("N more rows").
    pub hidden_rows: usize,
}

impl QueryResult {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    #[must_use]
    pub fn preview(&self, limit: usize) -> ResultPreview<'_> {
        let shown = self.rows.len().min(limit);
        ResultPreview {
            columns: &self.columns,
            rows: &self.rows[..shown],
            hidden_rows: self.row_count.max(self.rows.len()).saturating_sub(shown),
        }
    }
}

/// Structured error payload for a failed execution or submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryError {
    pub message: String,
}

impl QueryError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Contents of the execution result slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Rows(QueryResult),
    Failed(QueryError),
}

impl ExecutionOutcome {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        ExecutionOutcome::Failed(QueryError::new(message))
    }

    #[must_use]
    pub fn rows(&self) -> Option<&QueryResult> {
        match self {
            ExecutionOutcome::Rows(result) => Some(result),
            ExecutionOutcome::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&QueryError> {
        match self {
            ExecutionOutcome::Rows(_) => None,
            ExecutionOutcome::Failed(error) => Some(error),
        }
    }
}

/// Grading verdict for a submitted query.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub correct: bool,
    pub message: String,
    pub user_result: Option<ExecutionOutcome>,
    /// Evaluator-specific diff between expected and actual rows.
    pub diff: Option<Value>,
}

/// Contents of the submission result slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Graded(Grade),
    Failed(QueryError),
}

impl SubmissionOutcome {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        SubmissionOutcome::Failed(QueryError::new(message))
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        matches!(self, SubmissionOutcome::Graded(grade) if grade.correct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> QueryResult {
        let rows = (0..n)
            .map(|i| vec![Cell::Int(i as i64), Cell::Null])
            .collect();
        QueryResult::new(vec!["id".to_string(), "manager_id".to_string()], rows)
    }

    #[test]
    fn cells_decode_from_json_scalars() {
        let row: Vec<Cell> = serde_json::from_str(r#"[null, true, 42, 1.5, "Ada"]"#).unwrap();
        assert_eq!(
            row,
            vec![
                Cell::Null,
                Cell::Bool(true),
                Cell::Int(42),
                Cell::Float(1.5),
                Cell::Text("Ada".to_string()),
            ]
        );
    }

    #[test]
    fn cells_reject_nested_values() {
        let nested: Result<Cell, _> = serde_json::from_str("[1]");
        assert!(nested.is_err());
    }

    #[test]
    fn preview_truncates_and_counts_hidden_rows() {
        let result = numbered(8);
        let preview = result.preview(CHAT_PREVIEW_ROWS);
        assert_eq!(preview.rows.len(), 5);
        assert_eq!(preview.hidden_rows, 3);
        assert_eq!(result.row_count, 8);
    }

    #[test]
    fn preview_uses_reported_row_count() {
        let mut result = numbered(5);
        result.row_count = 120;
        let preview = result.preview(CHAT_PREVIEW_ROWS);
        assert_eq!(preview.rows.len(), 5);
        assert_eq!(preview.hidden_rows, 115);
    }

    #[test]
    fn preview_of_small_result_hides_nothing() {
        let result = numbered(2);
        let preview = result.preview(CHAT_PREVIEW_ROWS);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.hidden_rows, 0);
    }

    #[test]
    fn failed_outcome_is_distinct_from_empty_rows() {
        let empty = ExecutionOutcome::Rows(QueryResult::new(vec!["n".to_string()], Vec::new()));
        let failed = ExecutionOutcome::failed("no such table: employes");
        assert!(empty.error().is_none());
        assert!(empty.rows().is_some_and(QueryResult::is_empty));
        assert_eq!(
            failed.error().map(|e| e.message.as_str()),
            Some("no such table: employes")
        );
    }
}
