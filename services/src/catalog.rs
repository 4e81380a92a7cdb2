//! Exercise catalog endpoints.

use sqlcoach_types::{CatalogFilter, DataSource, Problem, ProblemId};

use crate::{BackendClient, CatalogService, ServiceError, ServiceFut, decode_json};

impl BackendClient {
    fn catalog_url(&self, mode: DataSource, filter: &CatalogFilter) -> Result<url::Url, ServiceError> {
        let mut url = self.endpoint("api/exercises/")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("source", mode.as_str());
            if let Some(difficulty) = filter.difficulty {
                query.append_pair("difficulty", difficulty.as_str());
            }
            if let Some(search) = filter.search.as_deref() {
                query.append_pair("search", search);
            }
            if let Some(schema_id) = filter.schema_id {
                query.append_pair("schema_id", &schema_id.to_string());
            }
        }
        Ok(url)
    }

    fn problem_url(&self, id: ProblemId, mode: DataSource) -> Result<url::Url, ServiceError> {
        let mut url = self.endpoint(&format!("api/exercises/{id}/"))?;
        url.query_pairs_mut().append_pair("source", mode.as_str());
        Ok(url)
    }
}

impl CatalogService for BackendClient {
    fn list<'a>(
        &'a self,
        mode: DataSource,
        filter: &'a CatalogFilter,
    ) -> ServiceFut<'a, Vec<Problem>> {
        Box::pin(async move {
            let url = self.catalog_url(mode, filter)?;
            tracing::debug!(%mode, "Fetching catalog");
            let response = self.http().get(url).send().await?;
            decode_json(response).await
        })
    }

    fn get(&self, id: ProblemId, mode: DataSource) -> ServiceFut<'_, Problem> {
        Box::pin(async move {
            let url = self.problem_url(id, mode)?;
            tracing::debug!(problem_id = %id, %mode, "Fetching problem");
            let response = self.http().get(url).send().await?;
            decode_json(response).await
        })
    }
}
