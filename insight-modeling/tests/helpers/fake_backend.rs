//! Scripted in-memory modeling service
//!
//! Responses are queued per operation and consumed in order; an empty queue
//! falls back to a benign default. Every request is recorded.

use async_trait::async_trait;
use insight_modeling::backend::types::{CollinearityResponse, HealthResponse, SuggestRolesResponse};
use insight_modeling::backend::{
    CollinearityRequest, HealthRequest, InterpretRequest, ModelingBackend, RunRequest,
    SelectVariablesRequest, SelectionOutcome, SuggestRolesRequest,
};
use insight_modeling::configuration::Recommendation;
use insight_modeling::result::ModelResult;
use insight_modeling::BackendError;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

type Queue<T> = Mutex<VecDeque<Result<T, BackendError>>>;

#[derive(Default)]
pub struct FakeBackend {
    suggest: Queue<SuggestRolesResponse>,
    select: Queue<SelectionOutcome>,
    collinearity: Queue<CollinearityResponse>,
    health: Queue<HealthResponse>,
    run: Queue<ModelResult>,
    export: Queue<String>,
    interpret: Queue<String>,

    pub suggest_calls: Mutex<Vec<SuggestRolesRequest>>,
    pub select_calls: Mutex<Vec<SelectVariablesRequest>>,
    pub collinearity_calls: Mutex<Vec<CollinearityRequest>>,
    pub health_calls: Mutex<Vec<HealthRequest>>,
    pub run_calls: Mutex<Vec<RunRequest>>,
    pub export_calls: Mutex<Vec<RunRequest>>,
    pub interpret_calls: Mutex<Vec<InterpretRequest>>,

    suggest_delay: Mutex<Option<Duration>>,
    select_delay: Mutex<Option<Duration>>,
    collinearity_delay: Mutex<Option<Duration>>,
    health_delay: Mutex<Option<Duration>>,
    run_delay: Mutex<Option<Duration>>,
    interpret_delay: Mutex<Option<Duration>>,
}

fn pop<T>(queue: &Queue<T>, fallback: impl FnOnce() -> T) -> Result<T, BackendError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Ok(fallback()))
}

async fn pause(delay: &Mutex<Option<Duration>>) {
    let delay = *delay.lock().unwrap();
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_suggestion(&self, response: Result<Recommendation, BackendError>) {
        self.suggest
            .lock()
            .unwrap()
            .push_back(response.map(|recommendation| SuggestRolesResponse { recommendation }));
    }

    pub fn push_selection(&self, response: Result<SelectionOutcome, BackendError>) {
        self.select.lock().unwrap().push_back(response);
    }

    pub fn push_collinearity(&self, response: Result<CollinearityResponse, BackendError>) {
        self.collinearity.lock().unwrap().push_back(response);
    }

    pub fn push_health(&self, response: Result<HealthResponse, BackendError>) {
        self.health.lock().unwrap().push_back(response);
    }

    pub fn push_run(&self, response: Result<ModelResult, BackendError>) {
        self.run.lock().unwrap().push_back(response);
    }

    pub fn push_export(&self, response: Result<String, BackendError>) {
        self.export.lock().unwrap().push_back(response);
    }

    pub fn push_interpretation(&self, response: Result<String, BackendError>) {
        self.interpret.lock().unwrap().push_back(response);
    }

    pub fn set_suggest_delay(&self, delay: Duration) {
        *self.suggest_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_select_delay(&self, delay: Duration) {
        *self.select_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_collinearity_delay(&self, delay: Duration) {
        *self.collinearity_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_health_delay(&self, delay: Duration) {
        *self.health_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_run_delay(&self, delay: Duration) {
        *self.run_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_interpret_delay(&self, delay: Duration) {
        *self.interpret_delay.lock().unwrap() = Some(delay);
    }

    pub fn run_count(&self) -> usize {
        self.run_calls.lock().unwrap().len()
    }

    /// Feature sets of every collinearity request, in order
    pub fn collinearity_feature_sets(&self) -> Vec<Vec<String>> {
        self.collinearity_calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.features.clone())
            .collect()
    }
}

#[async_trait]
impl ModelingBackend for FakeBackend {
    async fn suggest_roles(
        &self,
        request: SuggestRolesRequest,
    ) -> Result<SuggestRolesResponse, BackendError> {
        self.suggest_calls.lock().unwrap().push(request);
        pause(&self.suggest_delay).await;
        pop(&self.suggest, || SuggestRolesResponse {
            recommendation: Recommendation::default(),
        })
    }

    async fn select_variables(
        &self,
        request: SelectVariablesRequest,
    ) -> Result<SelectionOutcome, BackendError> {
        self.select_calls.lock().unwrap().push(request);
        pause(&self.select_delay).await;
        pop(&self.select, SelectionOutcome::default)
    }

    async fn check_collinearity(
        &self,
        request: CollinearityRequest,
    ) -> Result<CollinearityResponse, BackendError> {
        self.collinearity_calls.lock().unwrap().push(request);
        pause(&self.collinearity_delay).await;
        pop(&self.collinearity, || CollinearityResponse {
            status: "ok".to_string(),
            report: Vec::new(),
        })
    }

    async fn check_health(&self, request: HealthRequest) -> Result<HealthResponse, BackendError> {
        self.health_calls.lock().unwrap().push(request);
        pause(&self.health_delay).await;
        pop(&self.health, || HealthResponse { report: Vec::new() })
    }

    async fn run_model(&self, request: RunRequest) -> Result<ModelResult, BackendError> {
        self.run_calls.lock().unwrap().push(request);
        pause(&self.run_delay).await;
        pop(&self.run, ModelResult::default)
    }

    async fn export(&self, request: RunRequest) -> Result<String, BackendError> {
        self.export_calls.lock().unwrap().push(request);
        pop(&self.export, || "http://files.local/report.docx".to_string())
    }

    async fn interpret(&self, request: InterpretRequest) -> Result<String, BackendError> {
        self.interpret_calls.lock().unwrap().push(request);
        pause(&self.interpret_delay).await;
        pop(&self.interpret, || "No notable findings.".to_string())
    }
}
