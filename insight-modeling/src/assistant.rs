//! AI-backed role suggestion and result interpretation
//!
//! Thin wrappers over the two assistant operations, each guarded by its own
//! busy flag. Applying the answers is up to the caller.

use crate::backend::{InterpretRequest, ModelingBackend, SuggestRolesRequest};
use crate::busy::BusyFlag;
use crate::catalog::VariableMeta;
use crate::configuration::{ModelType, Recommendation};
use crate::error::BackendError;
use crate::result::ModelResult;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum AssistOutcome<T> {
    /// Same call already running
    Busy,
    Done(T),
    Failed(BackendError),
}

pub struct AssistantBridge {
    backend: Arc<dyn ModelingBackend>,
    suggesting: BusyFlag,
    interpreting: BusyFlag,
}

impl AssistantBridge {
    pub fn new(backend: Arc<dyn ModelingBackend>) -> Self {
        Self {
            backend,
            suggesting: BusyFlag::new(),
            interpreting: BusyFlag::new(),
        }
    }

    pub fn is_suggesting(&self) -> bool {
        self.suggesting.is_busy()
    }

    pub fn is_interpreting(&self) -> bool {
        self.interpreting.is_busy()
    }

    pub async fn suggest_roles(
        &self,
        model_type: ModelType,
        variables: Vec<VariableMeta>,
    ) -> AssistOutcome<Recommendation> {
        let Some(_busy) = self.suggesting.try_acquire() else {
            debug!("Role suggestion already running");
            return AssistOutcome::Busy;
        };

        let count = variables.len();
        match self
            .backend
            .suggest_roles(SuggestRolesRequest {
                model_type,
                variables,
            })
            .await
        {
            Ok(response) => {
                info!(
                    model_type = %model_type,
                    variables = count,
                    suggested = response.recommendation.features.len(),
                    "Role suggestion received"
                );
                AssistOutcome::Done(response.recommendation)
            }
            Err(e) => {
                warn!(error = %e, "Role suggestion failed");
                AssistOutcome::Failed(e)
            }
        }
    }

    pub async fn interpret(&self, model_type: ModelType, result: &ModelResult) -> AssistOutcome<String> {
        let Some(_busy) = self.interpreting.try_acquire() else {
            debug!("Interpretation already running");
            return AssistOutcome::Busy;
        };

        let request = InterpretRequest {
            model_type,
            summary: result.summary.clone(),
            metrics: result.metrics.clone(),
        };
        match self.backend.interpret(request).await {
            Ok(text) => AssistOutcome::Done(text),
            Err(e) => {
                warn!(error = %e, "Interpretation failed");
                AssistOutcome::Failed(e)
            }
        }
    }
}
