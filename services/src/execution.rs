//! Query execution and grading endpoints.

use sqlcoach_types::{ExecutionOutcome, SubmissionOutcome};

use crate::wire::{ExecuteWire, QueryBody, SubmitWire};
use crate::{BackendClient, ExecutionService, QueryRequest, ServiceError, ServiceFut, split_rejection};

impl BackendClient {
    async fn post_query(
        &self,
        request: &QueryRequest,
        action: &str,
    ) -> Result<Result<reqwest::Response, String>, ServiceError> {
        let url = self.endpoint(&format!("api/exercises/{}/{action}/", request.problem_id))?;
        tracing::debug!(problem_id = %request.problem_id, action, "Posting query");
        let response = self
            .http()
            .post(url)
            .json(&QueryBody {
                query: &request.code,
            })
            .send()
            .await?;
        split_rejection(response).await
    }
}

impl ExecutionService for BackendClient {
    fn execute(&self, request: QueryRequest) -> ServiceFut<'_, ExecutionOutcome> {
        Box::pin(async move {
            match self.post_query(&request, "execute").await? {
                Ok(response) => {
                    let wire: ExecuteWire = response
                        .json()
                        .await
                        .map_err(|e| ServiceError::Decode(e.to_string()))?;
                    Ok(wire.into_outcome())
                }
                Err(message) => Ok(ExecutionOutcome::failed(message)),
            }
        })
    }

    fn submit(&self, request: QueryRequest) -> ServiceFut<'_, SubmissionOutcome> {
        Box::pin(async move {
            match self.post_query(&request, "submit").await? {
                Ok(response) => {
                    let wire: SubmitWire = response
                        .json()
                        .await
                        .map_err(|e| ServiceError::Decode(e.to_string()))?;
                    Ok(wire.into_outcome())
                }
                Err(message) => Ok(SubmissionOutcome::failed(message)),
            }
        })
    }
}
