//! Backend collaborators for the sqlcoach session core.
//!
//! # Architecture
//!
//! The engine never talks HTTP directly. It holds trait objects for each
//! collaborator and spawns their futures:
//!
//! - [`CatalogService`] - problem list and per-problem detail
//! - [`ExecutionService`] - run or grade a query
//! - [`AssistantService`] - one tutor turn
//! - [`IdentityService`] - current user lookup and logout
//! - [`PlatformCapability`] - fullscreen requests
//!
//! [`BackendClient`] implements the first four against the exercise backend's JSON
//! API (one module per collaborator). [`NoFullscreen`] is the platform capability
//! for hosts that cannot go fullscreen.
//!
//! # Error Handling
//!
//! Transport and protocol failures surface as [`ServiceError`]. The execution and
//! submission endpoints answer bad queries with a 4xx JSON `{"error": ...}` body;
//! those are evaluator verdicts, so they decode to `Failed` outcomes instead of errors.
//!
//! There is no retry: every call makes exactly one request.

mod assistant;
mod catalog;
mod execution;
mod identity;
mod wire;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

pub use sqlcoach_types;
use sqlcoach_types::{
    AssistantReply, CatalogFilter, ChatTurn, DataSource, ExecutionOutcome, IdentityPayload,
    Problem, ProblemId, SubmissionOutcome,
};

const CONNECT_TIMEOUT_SECS: u64 = 10;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Collaborator future type alias.
pub type ServiceFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("not found")]
    NotFound,
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request task failed: {0}")]
    TaskFailed(String),
}

// ============================================================================
// Collaborator contracts
// ============================================================================

pub trait CatalogService: Send + Sync {
    /// Problems visible under `mode`, optionally filtered.
    fn list<'a>(&'a self, mode: DataSource, filter: &'a CatalogFilter)
    -> ServiceFut<'a, Vec<Problem>>;

    /// Full detail for one problem. Missing problems yield [`ServiceError::NotFound`].
    fn get(&self, id: ProblemId, mode: DataSource) -> ServiceFut<'_, Problem>;
}

/// Query text bound to the problem it is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub problem_id: ProblemId,
    pub code: String,
}

pub trait ExecutionService: Send + Sync {
    fn execute(&self, request: QueryRequest) -> ServiceFut<'_, ExecutionOutcome>;

    fn submit(&self, request: QueryRequest) -> ServiceFut<'_, SubmissionOutcome>;
}

pub trait AssistantService: Send + Sync {
    fn ask(&self, turn: ChatTurn) -> ServiceFut<'_, AssistantReply>;
}

pub trait IdentityService: Send + Sync {
    /// Look up the user behind the implicit session credential.
    ///
    /// Non-success statuses are errors; classifying the payload is the caller's job.
    fn current(&self) -> ServiceFut<'_, IdentityPayload>;

    fn logout(&self) -> ServiceFut<'_, ()>;
}

pub trait PlatformCapability: Send + Sync {
    fn request_fullscreen(&self) -> ServiceFut<'_, ()>;

    fn exit_fullscreen(&self) -> ServiceFut<'_, ()>;
}

/// Platform without fullscreen support. Every request fails with `Unsupported`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFullscreen;

impl PlatformCapability for NoFullscreen {
    fn request_fullscreen(&self) -> ServiceFut<'_, ()> {
        Box::pin(async { Err(ServiceError::Unsupported("fullscreen")) })
    }

    fn exit_fullscreen(&self) -> ServiceFut<'_, ()> {
        Box::pin(async { Err(ServiceError::Unsupported("fullscreen")) })
    }
}

// ============================================================================
// HTTP client
// ============================================================================

/// JSON client for the exercise backend.
///
/// Cheap to clone; clones share the connection pool and cookie store.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let http = base_client_builder().timeout(timeout).build()?;
        Self::with_client(base_url, http)
    }

    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, ServiceError> {
        let mut base = Url::parse(base_url.trim())?;
        // Url::join replaces the last path segment unless the base ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base, http })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        Ok(self.base.join(path)?)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

fn base_client_builder() -> reqwest::ClientBuilder {
    use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(concat!("sqlcoach/", env!("CARGO_PKG_VERSION")))
        .cookie_store(true)
        .default_headers(default_headers)
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Map non-success statuses to errors and decode a success body.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ServiceError> {
    let response = ensure_success(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::Decode(e.to_string()))
}

pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ServiceError::NotFound);
    }
    let body = read_capped_error_body(response).await;
    tracing::debug!(status = status.as_u16(), "Backend returned error status");
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Evaluator rejections arrive as 4xx `{"error": ...}` bodies.
///
/// Yields `Ok(Ok(response))` for a success response (handed back for decoding),
/// `Ok(Err(message))` for a rejection, and `Err` for anything else.
pub(crate) async fn split_rejection(
    response: reqwest::Response,
) -> Result<Result<reqwest::Response, String>, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(Ok(response));
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ServiceError::NotFound);
    }
    let body = read_capped_error_body(response).await;
    if status.is_client_error()
        && let Ok(rejection) = serde_json::from_str::<wire::ErrorBody>(&body)
    {
        return Ok(Err(rejection.error));
    }
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}
