//! Problem selection, code buffer, and result slots.
//!
//! The store never performs IO. Operations that need the backend return a ticket
//! describing the request; the workspace dispatches it and later hands the
//! ticket back with the result. Every ticket carries the token that was live
//! when it was issued, and results whose token no longer matches are dropped.
//!
//! Two counters make up the token space:
//! - `epoch` advances on every problem switch and every data-source switch. It
//!   guards detail loads and execute/submit outcomes.
//! - `catalog_generation` advances on every catalog request. Only the newest
//!   catalog response under the current mode is applied.

use sqlcoach_services::{QueryRequest, ServiceError};
use sqlcoach_types::{
    CatalogFilter, DataSource, ExecutionOutcome, Problem, ProblemId, SubmissionOutcome,
    TurnSnapshot, sort_catalog,
};

pub const NO_PROBLEM_SELECTED: &str = "No problem selected";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CatalogTicket {
    pub generation: u64,
    pub mode: DataSource,
    pub filter: CatalogFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DetailTicket {
    pub epoch: u64,
    pub id: ProblemId,
    pub mode: DataSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueryTicket {
    pub epoch: u64,
    pub request: QueryRequest,
}

/// Requests issued by a data-source switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModeSwitch {
    pub catalog: CatalogTicket,
    pub detail: Option<DetailTicket>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    mode: DataSource,
    catalog: Vec<Problem>,
    catalog_filter: CatalogFilter,
    catalog_generation: u64,
    catalog_loading: bool,
    selected: Option<ProblemId>,
    current: Option<Problem>,
    code: String,
    execution: Option<ExecutionOutcome>,
    submission: Option<SubmissionOutcome>,
    loading: bool,
    epoch: u64,
    /// Epoch under which `current` was loaded.
    resolved_epoch: Option<u64>,
}

impl SessionStore {
    #[must_use]
    pub fn new(mode: DataSource) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn mode(&self) -> DataSource {
        self.mode
    }

    /// Problems in display order.
    #[must_use]
    pub fn catalog(&self) -> &[Problem] {
        &self.catalog
    }

    #[must_use]
    pub fn catalog_filter(&self) -> &CatalogFilter {
        &self.catalog_filter
    }

    #[must_use]
    pub fn is_catalog_loading(&self) -> bool {
        self.catalog_loading
    }

    /// The most recently requested problem, resolved or not.
    #[must_use]
    pub fn selected_id(&self) -> Option<ProblemId> {
        self.selected
    }

    /// The last successfully loaded problem.
    ///
    /// While a switch is in flight this still holds the previous problem.
    #[must_use]
    pub fn current_problem(&self) -> Option<&Problem> {
        self.current.as_ref()
    }

    /// The current problem if it was loaded for the live selection and data source.
    #[must_use]
    pub fn resolved_problem(&self) -> Option<&Problem> {
        if self.loading || self.resolved_epoch != Some(self.epoch) {
            return None;
        }
        self.current
            .as_ref()
            .filter(|problem| Some(problem.id) == self.selected)
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn execution_result(&self) -> Option<&ExecutionOutcome> {
        self.execution.as_ref()
    }

    #[must_use]
    pub fn submission_result(&self) -> Option<&SubmissionOutcome> {
        self.submission.as_ref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    /// Error message of the execution slot, if it holds a failure.
    #[must_use]
    pub fn last_execution_error(&self) -> Option<&str> {
        self.execution
            .as_ref()
            .and_then(ExecutionOutcome::error)
            .map(|error| error.message.as_str())
    }

    /// Values a chat turn is composed from. `None` until a problem is resolved.
    #[must_use]
    pub fn chat_snapshot(&self) -> Option<TurnSnapshot> {
        let problem = self.resolved_problem()?;
        Some(TurnSnapshot {
            problem_id: problem.id,
            code: self.code.clone(),
            last_error: self.last_execution_error().map(str::to_string),
            mode: self.mode,
        })
    }

    fn clear_results(&mut self) {
        self.execution = None;
        self.submission = None;
    }

    fn advance_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    // ------------------------------------------------------------------
    // Data source
    // ------------------------------------------------------------------

    pub(crate) fn set_data_source_mode(&mut self, mode: DataSource) -> Option<ModeSwitch> {
        if mode == self.mode {
            return None;
        }
        tracing::info!(from = %self.mode, to = %mode, "Switching data source");
        self.mode = mode;
        self.advance_epoch();
        self.clear_results();
        self.catalog.clear();

        let filter = self.catalog_filter.clone();
        let catalog = self.load_catalog(filter);
        let detail = match self.selected {
            Some(id) => {
                self.loading = true;
                Some(self.detail_ticket(id))
            }
            None => None,
        };
        Some(ModeSwitch { catalog, detail })
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    pub(crate) fn load_catalog(&mut self, filter: CatalogFilter) -> CatalogTicket {
        self.catalog_generation += 1;
        self.catalog_loading = true;
        self.catalog_filter = filter.clone();
        CatalogTicket {
            generation: self.catalog_generation,
            mode: self.mode,
            filter,
        }
    }

    /// Apply a catalog response. Returns the detail request for the auto-selected
    /// first problem, if the catalog replaced an empty selection.
    pub(crate) fn apply_catalog(
        &mut self,
        ticket: &CatalogTicket,
        result: Result<Vec<Problem>, ServiceError>,
    ) -> Option<DetailTicket> {
        if ticket.generation != self.catalog_generation || ticket.mode != self.mode {
            tracing::debug!(
                generation = ticket.generation,
                mode = %ticket.mode,
                "Discarding stale catalog response"
            );
            return None;
        }
        self.catalog_loading = false;

        let mut problems = match result {
            Ok(problems) => problems,
            Err(e) => {
                tracing::warn!(mode = %self.mode, "Failed to load catalog: {e}");
                return None;
            }
        };
        sort_catalog(&mut problems);
        tracing::debug!(count = problems.len(), mode = %self.mode, "Catalog loaded");
        self.catalog = problems;

        if self.selected.is_some() {
            return None;
        }
        let first = self.catalog.first()?.id;
        self.select_problem(first)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub(crate) fn select_problem(&mut self, id: ProblemId) -> Option<DetailTicket> {
        if self.selected == Some(id) && self.resolved_problem().is_some() {
            return None;
        }
        self.selected = Some(id);
        self.clear_results();
        self.loading = true;
        self.advance_epoch();
        Some(self.detail_ticket(id))
    }

    fn detail_ticket(&self, id: ProblemId) -> DetailTicket {
        DetailTicket {
            epoch: self.epoch,
            id,
            mode: self.mode,
        }
    }

    /// Apply a detail response. Returns whether it was live.
    pub(crate) fn apply_detail(
        &mut self,
        ticket: DetailTicket,
        result: Result<Problem, ServiceError>,
    ) -> bool {
        let live = ticket.epoch == self.epoch
            && Some(ticket.id) == self.selected
            && ticket.mode == self.mode;
        if !live {
            tracing::debug!(
                problem_id = %ticket.id,
                epoch = ticket.epoch,
                "Discarding stale problem response"
            );
            return false;
        }

        self.loading = false;
        match result {
            Ok(problem) => {
                tracing::info!(problem_id = %problem.id, mode = %self.mode, "Problem loaded");
                self.code = problem.starting_query().to_string();
                self.current = Some(problem);
                self.resolved_epoch = Some(self.epoch);
                self.clear_results();
            }
            Err(e) => {
                tracing::warn!(problem_id = %ticket.id, "Failed to load problem: {e}");
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Execute / submit
    // ------------------------------------------------------------------

    fn query_ticket(&self, code: String) -> Option<QueryTicket> {
        let problem = self.resolved_problem()?;
        Some(QueryTicket {
            epoch: self.epoch,
            request: QueryRequest {
                problem_id: problem.id,
                code,
            },
        })
    }

    pub(crate) fn execute_query(&mut self, code: String) -> Option<QueryTicket> {
        let ticket = self.query_ticket(code);
        if ticket.is_none() {
            self.execution = Some(ExecutionOutcome::failed(NO_PROBLEM_SELECTED));
        }
        ticket
    }

    pub(crate) fn submit_query(&mut self, code: String) -> Option<QueryTicket> {
        let ticket = self.query_ticket(code);
        if ticket.is_none() {
            self.submission = Some(SubmissionOutcome::failed(NO_PROBLEM_SELECTED));
        }
        ticket
    }

    pub(crate) fn apply_execution(
        &mut self,
        ticket: &QueryTicket,
        result: Result<ExecutionOutcome, ServiceError>,
    ) -> bool {
        if ticket.epoch != self.epoch {
            tracing::debug!(
                problem_id = %ticket.request.problem_id,
                "Discarding execution result for a previous problem"
            );
            return false;
        }
        self.execution = Some(result.unwrap_or_else(|e| {
            tracing::warn!(problem_id = %ticket.request.problem_id, "Execution failed: {e}");
            ExecutionOutcome::failed(e.to_string())
        }));
        true
    }

    pub(crate) fn apply_submission(
        &mut self,
        ticket: &QueryTicket,
        result: Result<SubmissionOutcome, ServiceError>,
    ) -> bool {
        if ticket.epoch != self.epoch {
            tracing::debug!(
                problem_id = %ticket.request.problem_id,
                "Discarding submission result for a previous problem"
            );
            return false;
        }
        self.submission = Some(result.unwrap_or_else(|e| {
            tracing::warn!(problem_id = %ticket.request.problem_id, "Submission failed: {e}");
            SubmissionOutcome::failed(e.to_string())
        }));
        true
    }
}

#[cfg(test)]
mod tests {
    use sqlcoach_types::{Difficulty, FALLBACK_QUERY, QueryResult, SchemaRef};

    use super::*;

    fn problem(id: u64, order: Option<i64>, initial: Option<&str>) -> Problem {
        Problem {
            id: ProblemId::new(id),
            title: format!("Problem {id}"),
            description: String::new(),
            difficulty: Difficulty::Easy,
            schema: SchemaRef::named("HR"),
            initial_query: initial.map(str::to_string),
            order,
            tags: None,
        }
    }

    fn loaded(id: u64, initial: Option<&str>) -> SessionStore {
        let mut store = SessionStore::new(DataSource::Mock);
        let ticket = store.select_problem(ProblemId::new(id)).unwrap();
        assert!(store.apply_detail(ticket, Ok(problem(id, None, initial))));
        store
    }

    #[test]
    fn catalog_sorts_and_selects_first() {
        let mut store = SessionStore::new(DataSource::Mock);
        let ticket = store.load_catalog(CatalogFilter::default());
        let detail = store
            .apply_catalog(
                &ticket,
                Ok(vec![problem(1, Some(2), None), problem(2, Some(1), None)]),
            )
            .unwrap();
        let ids: Vec<_> = store.catalog().iter().map(|p| p.id.value()).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(detail.id, ProblemId::new(2));
        assert_eq!(store.selected_id(), Some(ProblemId::new(2)));
        assert!(store.is_loading());
    }

    #[test]
    fn catalog_keeps_existing_selection() {
        let mut store = loaded(7, None);
        let ticket = store.load_catalog(CatalogFilter::default());
        let detail = store.apply_catalog(&ticket, Ok(vec![problem(1, Some(1), None)]));
        assert!(detail.is_none());
        assert_eq!(store.selected_id(), Some(ProblemId::new(7)));
    }

    #[test]
    fn older_catalog_request_is_ignored() {
        let mut store = SessionStore::new(DataSource::Mock);
        let first = store.load_catalog(CatalogFilter::default());
        let second = store.load_catalog(CatalogFilter::default().with_search("join"));
        store.apply_catalog(&second, Ok(vec![problem(3, None, None)]));
        store.apply_catalog(&first, Ok(vec![problem(1, None, None), problem(2, None, None)]));
        assert_eq!(store.catalog().len(), 1);
        assert_eq!(store.catalog()[0].id, ProblemId::new(3));
    }

    #[test]
    fn catalog_failure_keeps_contents() {
        let mut store = SessionStore::new(DataSource::Mock);
        let ticket = store.load_catalog(CatalogFilter::default());
        store.apply_catalog(&ticket, Ok(vec![problem(1, None, None)]));
        let retry = store.load_catalog(CatalogFilter::default());
        let detail = store.apply_catalog(&retry, Err(ServiceError::NotFound));
        assert!(detail.is_none());
        assert_eq!(store.catalog().len(), 1);
        assert!(!store.is_catalog_loading());
    }

    #[test]
    fn empty_catalog_selects_nothing() {
        let mut store = SessionStore::new(DataSource::Mock);
        let ticket = store.load_catalog(CatalogFilter::default());
        assert!(store.apply_catalog(&ticket, Ok(Vec::new())).is_none());
        assert_eq!(store.selected_id(), None);
    }

    #[test]
    fn load_resets_code_to_initial_query() {
        let store = loaded(1, Some("SELECT name FROM employees"));
        assert_eq!(store.code(), "SELECT name FROM employees");
        assert!(!store.is_loading());

        let store = loaded(2, None);
        assert_eq!(store.code(), FALLBACK_QUERY);
    }

    #[test]
    fn stale_detail_is_discarded() {
        let mut store = SessionStore::new(DataSource::Mock);
        let one = store.select_problem(ProblemId::new(1)).unwrap();
        let two = store.select_problem(ProblemId::new(2)).unwrap();
        assert!(store.apply_detail(two, Ok(problem(2, None, Some("SELECT 2")))));
        assert!(!store.apply_detail(one, Ok(problem(1, None, Some("SELECT 1 + 1")))));
        assert_eq!(store.current_problem().map(|p| p.id), Some(ProblemId::new(2)));
        assert_eq!(store.code(), "SELECT 2");
    }

    #[test]
    fn reselecting_loaded_problem_is_noop() {
        let mut store = loaded(1, None);
        store.set_code("SELECT COUNT(*) FROM employees");
        assert!(store.select_problem(ProblemId::new(1)).is_none());
        assert_eq!(store.code(), "SELECT COUNT(*) FROM employees");
    }

    #[test]
    fn failed_load_keeps_previous_problem() {
        let mut store = loaded(1, Some("SELECT a"));
        let ticket = store.select_problem(ProblemId::new(2)).unwrap();
        assert!(store.apply_detail(ticket, Err(ServiceError::NotFound)));
        assert!(!store.is_loading());
        assert_eq!(store.current_problem().map(|p| p.id), Some(ProblemId::new(1)));
        assert_eq!(store.selected_id(), Some(ProblemId::new(2)));
        assert!(store.resolved_problem().is_none());
        assert!(store.chat_snapshot().is_none());
    }

    #[test]
    fn selection_clears_results() {
        let mut store = loaded(1, None);
        let ticket = store.execute_query("SELECT 1".to_string()).unwrap();
        store.apply_execution(&ticket, Ok(ExecutionOutcome::failed("boom")));
        assert!(store.execution_result().is_some());
        store.select_problem(ProblemId::new(2));
        assert!(store.execution_result().is_none());
        assert!(store.submission_result().is_none());
    }

    #[test]
    fn execute_without_problem_fails_locally() {
        let mut store = SessionStore::new(DataSource::Mock);
        assert!(store.execute_query("SELECT 1".to_string()).is_none());
        assert_eq!(store.last_execution_error(), Some(NO_PROBLEM_SELECTED));
        assert!(store.submit_query("SELECT 1".to_string()).is_none());
        assert_eq!(
            store.submission_result(),
            Some(&SubmissionOutcome::failed(NO_PROBLEM_SELECTED))
        );
    }

    #[test]
    fn execution_does_not_touch_code() {
        let mut store = loaded(1, Some("SELECT a"));
        store.set_code("SELECT b");
        let ticket = store.execute_query("SELECT b".to_string()).unwrap();
        assert_eq!(ticket.request.code, "SELECT b");
        let rows = QueryResult::new(vec!["b".to_string()], Vec::new());
        assert!(store.apply_execution(&ticket, Ok(ExecutionOutcome::Rows(rows))));
        assert_eq!(store.code(), "SELECT b");
        assert!(store.last_execution_error().is_none());
    }

    #[test]
    fn execution_error_becomes_failed_outcome() {
        let mut store = loaded(1, None);
        let ticket = store.execute_query("SELECT 1".to_string()).unwrap();
        store.apply_execution(&ticket, Err(ServiceError::NotFound));
        assert_eq!(store.last_execution_error(), Some("not found"));
    }

    #[test]
    fn stale_execution_is_dropped() {
        let mut store = loaded(1, None);
        let ticket = store.execute_query("SELECT 1".to_string()).unwrap();
        store.select_problem(ProblemId::new(2));
        assert!(!store.apply_execution(&ticket, Ok(ExecutionOutcome::failed("late"))));
        assert!(store.execution_result().is_none());
    }

    #[test]
    fn mode_switch_invalidates_and_reloads() {
        let mut store = loaded(1, None);
        let catalog = store.load_catalog(CatalogFilter::default().with_search("sum"));
        store.apply_catalog(&catalog, Ok(vec![problem(1, None, None)]));
        let pending = store.select_problem(ProblemId::new(1));
        assert!(pending.is_none());

        let ticket = store.execute_query("SELECT 1".to_string()).unwrap();
        let switch = store.set_data_source_mode(DataSource::Demo).unwrap();
        assert_eq!(store.mode(), DataSource::Demo);
        assert!(store.catalog().is_empty());
        assert_eq!(switch.catalog.mode, DataSource::Demo);
        assert_eq!(switch.catalog.filter.search.as_deref(), Some("sum"));
        let detail = switch.detail.unwrap();
        assert_eq!(detail.id, ProblemId::new(1));
        assert_eq!(detail.mode, DataSource::Demo);
        assert!(!store.apply_execution(&ticket, Ok(ExecutionOutcome::failed("late"))));
    }

    #[test]
    fn same_mode_is_noop() {
        let mut store = loaded(1, None);
        assert!(store.set_data_source_mode(DataSource::Mock).is_none());
        assert!(!store.is_loading());
    }

    #[test]
    fn old_mode_responses_are_discarded() {
        let mut store = SessionStore::new(DataSource::Mock);
        let catalog = store.load_catalog(CatalogFilter::default());
        let detail = store.select_problem(ProblemId::new(1)).unwrap();
        let switch = store.set_data_source_mode(DataSource::Demo).unwrap();

        assert!(store.apply_catalog(&catalog, Ok(vec![problem(9, None, None)])).is_none());
        assert!(store.catalog().is_empty());
        assert!(!store.apply_detail(detail, Ok(problem(1, None, Some("SELECT mock")))));

        let live = switch.detail.unwrap();
        assert!(store.apply_detail(live, Ok(problem(1, None, Some("SELECT demo")))));
        assert_eq!(store.code(), "SELECT demo");
    }

    #[test]
    fn failed_reload_after_mode_switch_leaves_problem_unresolved() {
        let mut store = loaded(1, Some("SELECT mock"));
        let switch = store.set_data_source_mode(DataSource::Demo).unwrap();
        let reload = switch.detail.unwrap();
        assert!(store.apply_detail(reload, Err(ServiceError::NotFound)));

        assert!(!store.is_loading());
        assert!(store.resolved_problem().is_none());
        assert!(store.chat_snapshot().is_none());
        assert!(store.execute_query("SELECT 1".to_string()).is_none());
        assert_eq!(store.last_execution_error(), Some(NO_PROBLEM_SELECTED));

        let retry = store.select_problem(ProblemId::new(1)).unwrap();
        assert_eq!(retry.mode, DataSource::Demo);
        assert!(store.apply_detail(retry, Ok(problem(1, None, Some("SELECT demo")))));
        assert_eq!(store.resolved_problem().map(|p| p.id), Some(ProblemId::new(1)));
        assert_eq!(store.code(), "SELECT demo");
    }

    #[test]
    fn snapshot_carries_last_error_and_mode() {
        let mut store = loaded(4, None);
        store.set_code("SELECT * FROM employes");
        let ticket = store.execute_query(store.code().to_string()).unwrap();
        store.apply_execution(&ticket, Ok(ExecutionOutcome::failed("no such table: employes")));
        let snapshot = store.chat_snapshot().unwrap();
        assert_eq!(snapshot.problem_id, ProblemId::new(4));
        assert_eq!(snapshot.code, "SELECT * FROM employes");
        assert_eq!(snapshot.last_error.as_deref(), Some("no such table: employes"));
        assert_eq!(snapshot.mode, DataSource::Mock);
    }
}
