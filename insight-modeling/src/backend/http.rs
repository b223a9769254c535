//! HTTP client for the modeling service
//!
//! JSON POSTs against `base_url` + operation path. The session token, when
//! present, is sent as a bearer token on every request.

use super::types::*;
use super::ModelingBackend;
use crate::error::BackendError;
use crate::result::ModelResult;
use async_trait::async_trait;
use insight_common::config::BackendConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

const USER_AGENT: &str = concat!("insight-modeling/", env!("CARGO_PKG_VERSION"));

pub const SUGGEST_ROLES_PATH: &str = "/modeling/ai-suggest-roles";
pub const SELECT_VARIABLES_PATH: &str = "/modeling/select-variables";
pub const CHECK_COLLINEARITY_PATH: &str = "/statistics/check-collinearity";
pub const CHECK_HEALTH_PATH: &str = "/statistics/check-health";
pub const RUN_PATH: &str = "/modeling/run";
pub const EXPORT_PATH: &str = "/modeling/export";
pub const INTERPRET_PATH: &str = "/modeling/ai-interpret";

/// Authenticated session, passed explicitly to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub base_url: String,
    pub token: Option<String>,
}

impl SessionContext {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.base_url.clone(), config.token.clone())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Error body shape used by the service
#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct HttpBackend {
    http_client: reqwest::Client,
    context: SessionContext,
}

impl HttpBackend {
    pub fn new(context: SessionContext, timeout: Duration) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            context,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Self::new(SessionContext::from_config(config), config.timeout())
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.context.url(path);
        debug!(url = %url, "POST modeling service");

        let mut request = self.http_client.post(&url).json(body);
        if let Some(token) = &self.context.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(url = %url, error = %e, "Modeling service unreachable");
            BackendError::Network(e.to_string())
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            error!(url = %url, "Modeling service rejected session token");
            return Err(BackendError::Unauthorized);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message);
            error!(url = %url, status = status.as_u16(), message = ?message, "Modeling service error");
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ModelingBackend for HttpBackend {
    async fn suggest_roles(
        &self,
        request: SuggestRolesRequest,
    ) -> Result<SuggestRolesResponse, BackendError> {
        self.post(SUGGEST_ROLES_PATH, &request).await
    }

    async fn select_variables(
        &self,
        request: SelectVariablesRequest,
    ) -> Result<SelectionOutcome, BackendError> {
        self.post(SELECT_VARIABLES_PATH, &request).await
    }

    async fn check_collinearity(
        &self,
        request: CollinearityRequest,
    ) -> Result<CollinearityResponse, BackendError> {
        self.post(CHECK_COLLINEARITY_PATH, &request).await
    }

    async fn check_health(&self, request: HealthRequest) -> Result<HealthResponse, BackendError> {
        self.post(CHECK_HEALTH_PATH, &request).await
    }

    async fn run_model(&self, request: RunRequest) -> Result<ModelResult, BackendError> {
        let response: RunResponse = self.post(RUN_PATH, &request).await?;
        Ok(response.results)
    }

    async fn export(&self, request: RunRequest) -> Result<String, BackendError> {
        let response: ExportResponse = self.post(EXPORT_PATH, &request).await?;
        Ok(response.download_url)
    }

    async fn interpret(&self, request: InterpretRequest) -> Result<String, BackendError> {
        let response: InterpretResponse = self.post(INTERPRET_PATH, &request).await?;
        Ok(response.interpretation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let ctx = SessionContext::new("http://localhost:5000/api/", None);
        assert_eq!(ctx.url(RUN_PATH), "http://localhost:5000/api/modeling/run");
    }

    #[test]
    fn test_context_from_config() {
        let config = BackendConfig {
            token: Some("abc".into()),
            ..Default::default()
        };
        let ctx = SessionContext::from_config(&config);
        assert_eq!(ctx.token.as_deref(), Some("abc"));
        assert_eq!(ctx.base_url, "http://127.0.0.1:5000/api");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let backend = HttpBackend::new(
            SessionContext::new("http://127.0.0.1:9", None),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = backend
            .export(RunRequest {
                project_id: EntityId::Int(1),
                dataset_id: EntityId::Int(1),
                config: Default::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Network(_)));
    }
}
