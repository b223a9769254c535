//! Single-flight model execution

use crate::backend::{EntityId, ModelingBackend, RunRequest};
use crate::busy::BusyFlag;
use crate::configuration::ModelConfig;
use crate::error::BackendError;
use crate::result::ModelResult;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shown when the backend reports a failed fit without saying why
pub const DEFAULT_FAILURE_MESSAGE: &str = "Model fitting failed";

#[derive(Debug)]
pub enum RunOutcome {
    /// Another run is in progress; nothing was sent
    Busy,
    Completed(Box<ModelResult>),
    /// The service ran but could not produce a fit (singular design, ...)
    AnalyticalFailure(String),
    TransportFailure(BackendError),
}

pub struct ModelRunner {
    backend: Arc<dyn ModelingBackend>,
    busy: BusyFlag,
}

impl ModelRunner {
    pub fn new(backend: Arc<dyn ModelingBackend>) -> Self {
        Self {
            backend,
            busy: BusyFlag::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Submit `config` for fitting. Re-entry while a run is outstanding is a no-op.
    pub async fn run(
        &self,
        config: &ModelConfig,
        project_id: &EntityId,
        dataset_id: &EntityId,
    ) -> RunOutcome {
        let Some(_busy) = self.busy.try_acquire() else {
            debug!("Model run ignored: already running");
            return RunOutcome::Busy;
        };

        let request = RunRequest {
            project_id: project_id.clone(),
            dataset_id: dataset_id.clone(),
            config: config.clone(),
        };

        match self.backend.run_model(request).await {
            Ok(result) if result.is_failed() => {
                let message = result
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                warn!(model_type = %config.model_type, message = %message, "Model fit failed");
                RunOutcome::AnalyticalFailure(message)
            }
            Ok(result) => {
                info!(
                    model_type = %config.model_type,
                    features = config.features.len(),
                    summary_rows = result.summary.len(),
                    "Model run completed"
                );
                RunOutcome::Completed(Box::new(result))
            }
            Err(e) => {
                error!(model_type = %config.model_type, error = %e, "Model run request failed");
                RunOutcome::TransportFailure(e)
            }
        }
    }
}
