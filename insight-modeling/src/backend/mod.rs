//! Modeling service abstraction
//!
//! Every remote operation the engine consumes goes through [`ModelingBackend`].
//! [`HttpBackend`] is the production implementation; tests substitute a
//! scripted in-memory backend.

pub mod http;
pub mod types;

use crate::error::BackendError;
use crate::result::ModelResult;
use async_trait::async_trait;

pub use http::{HttpBackend, SessionContext};
pub use types::{
    CollinearityRequest, CollinearityResponse, EntityId, ExportResponse, HealthRequest,
    HealthResponse, InterpretRequest, RunRequest, SelectVariablesRequest, SelectionOutcome,
    SelectionParams, SuggestRolesRequest, SuggestRolesResponse,
};

/// Remote statistical service
#[async_trait]
pub trait ModelingBackend: Send + Sync {
    /// Propose target/feature roles for the dataset variables
    async fn suggest_roles(
        &self,
        request: SuggestRolesRequest,
    ) -> Result<SuggestRolesResponse, BackendError>;

    /// Automatic variable selection (stepwise, ...)
    async fn select_variables(
        &self,
        request: SelectVariablesRequest,
    ) -> Result<SelectionOutcome, BackendError>;

    async fn check_collinearity(
        &self,
        request: CollinearityRequest,
    ) -> Result<CollinearityResponse, BackendError>;

    async fn check_health(&self, request: HealthRequest) -> Result<HealthResponse, BackendError>;

    /// Fit the model. Analytical failures come back as `Ok` with a failed status.
    async fn run_model(&self, request: RunRequest) -> Result<ModelResult, BackendError>;

    /// Render the report for a configuration; returns the download URL
    async fn export(&self, request: RunRequest) -> Result<String, BackendError>;

    /// Plain-language interpretation of a result
    async fn interpret(&self, request: InterpretRequest) -> Result<String, BackendError>;
}
