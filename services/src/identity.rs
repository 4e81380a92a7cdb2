//! Session identity endpoints.

use sqlcoach_types::IdentityPayload;

use crate::{BackendClient, IdentityService, ServiceFut, decode_json, ensure_success};

impl IdentityService for BackendClient {
    fn current(&self) -> ServiceFut<'_, IdentityPayload> {
        Box::pin(async move {
            let url = self.endpoint("api/auth/me/")?;
            let response = self.http().get(url).send().await?;
            decode_json(response).await
        })
    }

    fn logout(&self) -> ServiceFut<'_, ()> {
        Box::pin(async move {
            let url = self.endpoint("api/auth/logout/")?;
            let response = self.http().post(url).send().await?;
            ensure_success(response).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::ServiceError;

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn current_decodes_partial_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"authenticated": true, "username": "ada"})),
            )
            .mount(&server)
            .await;

        let payload = client(&server).current().await.unwrap();
        assert_eq!(payload.authenticated, Some(true));
        assert_eq!(payload.username.as_deref(), Some("ada"));
        assert_eq!(payload.role, None);
    }

    #[tokio::test]
    async fn current_forbidden_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client(&server).current().await.unwrap_err();
        assert!(matches!(err, ServiceError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn logout_rejection_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/logout/"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "User is not logged in"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).logout().await.unwrap_err();
        assert!(matches!(err, ServiceError::Status { status: 400, .. }));
    }
}
