//! Session orchestration for the sqlcoach workspace.
//!
//! [`Workspace`] owns the four stores and every in-flight backend request.
//! User actions are methods on `&mut Workspace`; each one mutates state
//! synchronously and may spawn tokio tasks. A task resumes exactly once by
//! sending a [`Completion`] back on the workspace channel. The host applies
//! completions from its own loop:
//!
//! - [`Workspace::process_events`] drains whatever has arrived without blocking
//! - [`Workspace::next_event`] waits for the next completion
//!
//! Completions carry the ticket issued when the request started. The owning
//! store re-validates the ticket before applying, so a response for a problem,
//! data source, or identity that has since changed is dropped instead of
//! overwriting newer state.
//!
//! Every backend call is bounded by the configured timeout; expiry is reported
//! as [`ServiceError::Timeout`] and handled like any other failure.

mod chat;
mod identity;
mod layout;
pub mod logging;
mod session;


use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;

pub use chat::{ChatEngine, FALLBACK_REPLY};
pub use identity::{IdentityState, classify};
pub use layout::PanelLayoutController;
pub use session::{NO_PROBLEM_SELECTED, SessionStore};
pub use sqlcoach_config::SqlcoachConfig;
pub use sqlcoach_services::{
    AssistantService, BackendClient, CatalogService, ExecutionService, IdentityService,
    NoFullscreen, PlatformCapability, ServiceError,
};
pub use sqlcoach_types;

use chat::ChatTicket;
use identity::IdentityTicket;
use session::{CatalogTicket, DetailTicket, QueryTicket};
use sqlcoach_types::{
    AssistantReply, CatalogFilter, ExecutionOutcome, Identity, IdentityPayload, MessageId,
    Problem, ProblemId, SubmissionOutcome,
};

// ============================================================================
// Collaborators
// ============================================================================

/// The external services a workspace depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogService>,
    pub execution: Arc<dyn ExecutionService>,
    pub assistant: Arc<dyn AssistantService>,
    pub identity: Arc<dyn IdentityService>,
    pub platform: Arc<dyn PlatformCapability>,
}

impl Collaborators {
    /// All backend collaborators served by one HTTP client.
    #[must_use]
    pub fn http(client: BackendClient, platform: Arc<dyn PlatformCapability>) -> Self {
        let client = Arc::new(client);
        Self {
            catalog: client.clone(),
            execution: client.clone(),
            assistant: client.clone(),
            identity: client,
            platform,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Construction parameters not tied to a collaborator.
#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    /// Upper bound on every backend call.
    pub timeout: Duration,
    /// Initial panel flags. `demo_mode` also picks the initial data source.
    pub layout: sqlcoach_types::LayoutFlags,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(sqlcoach_config::DEFAULT_TIMEOUT_SECS),
            layout: sqlcoach_types::LayoutFlags::default(),
        }
    }
}

impl WorkspaceOptions {
    #[must_use]
    pub fn from_config(config: &SqlcoachConfig) -> Self {
        let layout = config.layout();
        Self {
            timeout: config.timeout(),
            layout: sqlcoach_types::LayoutFlags {
                sidebar_visible: layout.sidebar_visible,
                chat_visible: layout.chat_visible,
                demo_mode: config.demo_mode(),
            },
        }
    }
}

// ============================================================================
// Completions
// ============================================================================

/// Result of one finished backend request, tagged with its ticket.
#[derive(Debug)]
enum Completion {
    Catalog {
        ticket: CatalogTicket,
        result: Result<Vec<Problem>, ServiceError>,
    },
    Detail {
        ticket: DetailTicket,
        result: Result<Problem, ServiceError>,
    },
    Execution {
        ticket: QueryTicket,
        result: Result<ExecutionOutcome, ServiceError>,
    },
    Submission {
        ticket: QueryTicket,
        result: Result<SubmissionOutcome, ServiceError>,
    },
    Chat {
        message_id: MessageId,
        result: Result<AssistantReply, ServiceError>,
    },
    Identity {
        ticket: IdentityTicket,
        result: Result<IdentityPayload, ServiceError>,
    },
    Logout {
        result: Result<(), ServiceError>,
    },
    Fullscreen {
        enter: bool,
        result: Result<(), ServiceError>,
    },
}

// ============================================================================
// Workspace
// ============================================================================

#[derive(Debug)]
pub struct Workspace {
    services: Collaborators,
    timeout: Duration,
    session: SessionStore,
    chat: ChatEngine,
    identity: IdentityState,
    layout: PanelLayoutController,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl Workspace {
    #[must_use]
    pub fn new(services: Collaborators, options: WorkspaceOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            services,
            timeout: options.timeout,
            session: SessionStore::new(options.layout.data_source()),
            chat: ChatEngine::new(),
            identity: IdentityState::new(),
            layout: PanelLayoutController::new(options.layout),
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Build a workspace talking to the configured backend over HTTP.
    pub fn from_config(config: &SqlcoachConfig) -> anyhow::Result<Self> {
        let base_url = config.base_url();
        let client = BackendClient::new(&base_url, config.timeout())
            .with_context(|| format!("Failed to create backend client for {base_url}"))?;
        let services = Collaborators::http(client, Arc::new(NoFullscreen));
        Ok(Self::new(services, WorkspaceOptions::from_config(config)))
    }

    /// Initial identity lookup and catalog load.
    pub fn start(&mut self) {
        self.refresh_identity();
        self.load_catalog(CatalogFilter::default());
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn chat(&self) -> &ChatEngine {
        &self.chat
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityState {
        &self.identity
    }

    #[must_use]
    pub fn layout(&self) -> &PanelLayoutController {
        &self.layout
    }

    /// Requests spawned but not yet applied.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn spawn<T, F, W>(&mut self, request: F, wrap: W)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, ServiceError>> + Send + 'static,
        W: FnOnce(Result<T, ServiceError>) -> Completion + Send + 'static,
    {
        let tx = self.tx.clone();
        let limit = self.timeout;
        self.in_flight += 1;
        tokio::spawn(async move {
            // Inner task so a panicking collaborator still yields a completion.
            let call = tokio::spawn(async move {
                match tokio::time::timeout(limit, request).await {
                    Ok(result) => result,
                    Err(_) => Err(ServiceError::Timeout(limit)),
                }
            });
            let result = match call.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!("Request task failed: {e}");
                    Err(ServiceError::TaskFailed(e.to_string()))
                }
            };
            // The receiver lives as long as the workspace; a send error means it is gone.
            let _ = tx.send(wrap(result));
        });
    }

    // ------------------------------------------------------------------
    // Catalog and selection
    // ------------------------------------------------------------------

    pub fn load_catalog(&mut self, filter: CatalogFilter) {
        let ticket = self.session.load_catalog(filter);
        self.dispatch_catalog(ticket);
    }

    fn dispatch_catalog(&mut self, ticket: CatalogTicket) {
        let catalog = Arc::clone(&self.services.catalog);
        let (mode, filter) = (ticket.mode, ticket.filter.clone());
        self.spawn(
            async move { catalog.list(mode, &filter).await },
            move |result| Completion::Catalog { ticket, result },
        );
    }

    pub fn select_problem(&mut self, id: ProblemId) {
        if let Some(ticket) = self.session.select_problem(id) {
            self.dispatch_detail(ticket);
        }
    }

    fn dispatch_detail(&mut self, ticket: DetailTicket) {
        let catalog = Arc::clone(&self.services.catalog);
        self.spawn(
            async move { catalog.get(ticket.id, ticket.mode).await },
            move |result| Completion::Detail { ticket, result },
        );
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.session.set_code(code);
    }

    // ------------------------------------------------------------------
    // Execute / submit
    // ------------------------------------------------------------------

    pub fn execute_query(&mut self, code: impl Into<String>) {
        let Some(ticket) = self.session.execute_query(code.into()) else {
            return;
        };
        let execution = Arc::clone(&self.services.execution);
        let request = ticket.request.clone();
        self.spawn(
            async move { execution.execute(request).await },
            move |result| Completion::Execution { ticket, result },
        );
    }

    pub fn submit_query(&mut self, code: impl Into<String>) {
        let Some(ticket) = self.session.submit_query(code.into()) else {
            return;
        };
        let execution = Arc::clone(&self.services.execution);
        let request = ticket.request.clone();
        self.spawn(
            async move { execution.submit(request).await },
            move |result| Completion::Submission { ticket, result },
        );
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    pub fn set_chat_draft(&mut self, text: impl Into<String>) {
        self.chat.set_draft(text);
    }

    /// Send `text` about the current problem. Ignored when blank, while a
    /// reply is pending, or before a problem has loaded.
    pub fn send_chat(&mut self, text: &str) {
        let snapshot = self.session.chat_snapshot();
        if let Some(ticket) = self.chat.send(text, snapshot) {
            self.dispatch_chat(ticket);
        }
    }

    pub fn send_chat_draft(&mut self) {
        let snapshot = self.session.chat_snapshot();
        if let Some(ticket) = self.chat.send_draft(snapshot) {
            self.dispatch_chat(ticket);
        }
    }

    fn dispatch_chat(&mut self, ticket: ChatTicket) {
        let assistant = Arc::clone(&self.services.assistant);
        let ChatTicket { message_id, turn } = ticket;
        self.spawn(
            async move { assistant.ask(turn).await },
            move |result| Completion::Chat { message_id, result },
        );
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    pub fn refresh_identity(&mut self) {
        let ticket = self.identity.refresh();
        let identity = Arc::clone(&self.services.identity);
        self.spawn(
            async move { identity.current().await },
            move |result| Completion::Identity { ticket, result },
        );
    }

    pub fn set_auth(&mut self, identity: Identity) {
        self.identity.set_auth(identity);
    }

    /// Sign out locally right away, then tell the backend.
    pub fn logout(&mut self) {
        self.identity.set_auth(Identity::SignedOut);
        let identity = Arc::clone(&self.services.identity);
        self.spawn(
            async move { identity.logout().await },
            |result| Completion::Logout { result },
        );
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    pub fn toggle_sidebar(&mut self) {
        self.layout.toggle_sidebar();
    }

    pub fn toggle_chat(&mut self) {
        self.layout.toggle_chat();
    }

    pub fn toggle_demo_mode(&mut self) {
        let demo = !self.layout.flags().demo_mode;
        self.set_data_source_mode(demo);
    }

    /// Switch between the mock and demo data sources.
    pub fn set_data_source_mode(&mut self, demo: bool) {
        let mode = self.layout.set_demo_mode(demo);
        let Some(switch) = self.session.set_data_source_mode(mode) else {
            return;
        };
        self.dispatch_catalog(switch.catalog);
        if let Some(detail) = switch.detail {
            self.dispatch_detail(detail);
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        let Some(enter) = self.layout.toggle_fullscreen() else {
            return;
        };
        let platform = Arc::clone(&self.services.platform);
        self.spawn(
            async move {
                if enter {
                    platform.request_fullscreen().await
                } else {
                    platform.exit_fullscreen().await
                }
            },
            move |result| Completion::Fullscreen { enter, result },
        );
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Apply every completion that has already arrived. Never blocks.
    ///
    /// Returns the number of completions applied, stale ones included.
    pub fn process_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Wait for and apply the next completion. Returns `false` immediately when
    /// nothing is in flight.
    pub async fn next_event(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.rx.recv().await {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Apply completions until nothing is in flight, including requests that
    /// applied completions trigger.
    pub async fn settle(&mut self) {
        while self.next_event().await {}
    }

    fn apply(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Catalog { ticket, result } => {
                if let Some(detail) = self.session.apply_catalog(&ticket, result) {
                    self.dispatch_detail(detail);
                }
            }
            Completion::Detail { ticket, result } => {
                self.session.apply_detail(ticket, result);
            }
            Completion::Execution { ticket, result } => {
                self.session.apply_execution(&ticket, result);
            }
            Completion::Submission { ticket, result } => {
                self.session.apply_submission(&ticket, result);
            }
            Completion::Chat { message_id, result } => {
                self.chat.apply_reply(message_id, result);
            }
            Completion::Identity { ticket, result } => {
                self.identity.apply_refresh(ticket, result);
            }
            Completion::Logout { result } => match result {
                Ok(()) => tracing::info!("Backend session closed"),
                Err(e) => tracing::warn!("Logout request failed: {e}"),
            },
            Completion::Fullscreen { enter, result } => {
                self.layout.apply_fullscreen(enter, result);
            }
        }
    }
}
