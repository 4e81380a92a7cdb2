//! Backend JSON payloads.
//!
//! The backend reports query failures inline (`success: false` plus `error`), so
//! these types exist to fold that flat shape into the typed outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use sqlcoach_types::{
    AssistantReply, Cell, ExecutionOutcome, Grade, Intent, QueryResult, SubmissionOutcome,
};

#[derive(Debug, Serialize)]
pub(crate) struct QueryBody<'a> {
    pub query: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

/// Executor reply, shared by `/execute/` and the `user_result` of `/submit/`.
#[derive(Debug, Deserialize)]
pub(crate) struct ExecuteWire {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Cell>>,
    #[serde(default)]
    row_count: Option<usize>,
    #[serde(default)]
    execution_time: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

impl ExecuteWire {
    pub(crate) fn into_outcome(self) -> ExecutionOutcome {
        if !self.success || self.error.is_some() {
            let message = self
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "Query failed".to_string());
            return ExecutionOutcome::failed(message);
        }
        let row_count = self.row_count.unwrap_or(self.rows.len());
        ExecutionOutcome::Rows(QueryResult {
            columns: self.columns,
            rows: self.rows,
            row_count,
            execution_time: self.execution_time,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitWire {
    correct: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    user_result: Option<ExecuteWire>,
    #[serde(default)]
    diff: Option<Value>,
}

impl SubmitWire {
    pub(crate) fn into_outcome(self) -> SubmissionOutcome {
        SubmissionOutcome::Graded(Grade {
            correct: self.correct,
            message: self.message,
            user_result: self.user_result.map(ExecuteWire::into_outcome),
            diff: self.diff.filter(|d| !d.is_null()),
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AskBody<'a> {
    pub message: &'a str,
    pub user_query: &'a str,
    pub error: Option<&'a str>,
    pub demo_mode: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AskWire {
    #[serde(default)]
    response: String,
    #[serde(default)]
    intent: Option<Intent>,
    #[serde(default)]
    sql_query: Option<String>,
    #[serde(default)]
    query_result: Option<ExecuteWire>,
    #[serde(default)]
    executed: Option<bool>,
    #[serde(default)]
    execution_error: Option<String>,
}

impl AskWire {
    pub(crate) fn into_reply(self) -> AssistantReply {
        // An attached result that itself failed is reported through execution_error.
        let (result, result_error) = match self.query_result.map(ExecuteWire::into_outcome) {
            Some(ExecutionOutcome::Rows(result)) => (Some(result), None),
            Some(ExecutionOutcome::Failed(error)) => (None, Some(error.message)),
            None => (None, None),
        };
        AssistantReply {
            text: self.response,
            sql: self.sql_query,
            result,
            executed: self.executed,
            intent: self.intent,
            execution_error: self.execution_error.or(result_error),
        }
    }
}
