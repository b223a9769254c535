//! Debounced background collinearity screening
//!
//! Phases: `Idle → Pending (debounce window open) → Checking → Idle`.
//!
//! Every feature-set change cancels the pending timer, clears the current
//! report and opens a new debounce window. Fewer than two features never
//! reach the backend. At most one check is in flight; a window that closes
//! while a check is running is remembered and re-issued against the feature
//! set current at that moment. A response is applied only if the feature set
//! still equals the one it was computed for.

use crate::backend::types::{CollinearityFinding, CollinearityRequest, CollinearityResponse};
use crate::backend::{EntityId, ModelingBackend};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const MIN_FEATURES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollinearityStatus {
    Ok,
    Warning,
}

/// Outcome of the most recent check for the current feature set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollinearityReport {
    pub status: CollinearityStatus,
    pub findings: Vec<CollinearityFinding>,
}

impl From<CollinearityResponse> for CollinearityReport {
    fn from(response: CollinearityResponse) -> Self {
        let status = if response.status.eq_ignore_ascii_case("ok") {
            CollinearityStatus::Ok
        } else {
            CollinearityStatus::Warning
        };
        Self {
            status,
            findings: response.report,
        }
    }
}

impl CollinearityReport {
    /// User-facing warning built from the first finding
    pub fn warning_message(&self) -> Option<String> {
        if self.status == CollinearityStatus::Ok {
            return None;
        }
        let first = self.findings.first()?;
        let vif = first
            .vif
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".to_string());
        Some(format!(
            "Collinearity risk detected: {} (VIF={}). Consider removing this variable.",
            first.message, vif
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPhase {
    Idle,
    Pending,
    Checking,
}

#[derive(Default)]
struct GuardInner {
    dataset_id: Option<EntityId>,
    features: Vec<String>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
    in_flight: bool,
    refire: bool,
    report: Option<CollinearityReport>,
}

impl GuardInner {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation += 1;
    }

    fn checkable(&self) -> Option<(EntityId, Vec<String>)> {
        if self.features.len() < MIN_FEATURES {
            return None;
        }
        self.dataset_id
            .clone()
            .map(|dataset| (dataset, self.features.clone()))
    }
}

/// Debounced multicollinearity checker. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CollinearityGuard {
    backend: Arc<dyn ModelingBackend>,
    debounce: Duration,
    inner: Arc<Mutex<GuardInner>>,
}

impl CollinearityGuard {
    pub fn new(backend: Arc<dyn ModelingBackend>, debounce: Duration) -> Self {
        Self {
            backend,
            debounce,
            inner: Arc::new(Mutex::new(GuardInner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardInner> {
        // State stays consistent across a panicking holder; keep going
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Switch dataset. Pending work for the old dataset is dropped.
    pub fn set_dataset(&self, dataset_id: Option<EntityId>) {
        let mut inner = self.lock();
        inner.cancel_timer();
        inner.refire = false;
        inner.report = None;
        inner.dataset_id = dataset_id;
    }

    /// Record a feature-set change and (re)open the debounce window.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_features_changed(&self, features: &[String]) {
        let mut inner = self.lock();
        inner.features = features.to_vec();
        inner.report = None;
        inner.cancel_timer();

        if inner.checkable().is_none() {
            inner.refire = false;
            debug!(features = features.len(), "Collinearity check skipped");
            return;
        }

        let generation = inner.generation;
        let guard = self.clone();
        let debounce = self.debounce;
        debug!(features = features.len(), debounce_ms = debounce.as_millis() as u64, "Collinearity check scheduled");
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            guard.fire(generation).await;
        }));
    }

    /// Cancel any pending window without touching the report
    pub fn cancel_pending(&self) {
        let mut inner = self.lock();
        inner.cancel_timer();
        inner.refire = false;
    }

    pub fn phase(&self) -> GuardPhase {
        let inner = self.lock();
        if inner.in_flight {
            GuardPhase::Checking
        } else if inner.timer.is_some() {
            GuardPhase::Pending
        } else {
            GuardPhase::Idle
        }
    }

    pub fn is_checking(&self) -> bool {
        self.lock().in_flight
    }

    pub fn report(&self) -> Option<CollinearityReport> {
        self.lock().report.clone()
    }

    pub fn warning_message(&self) -> Option<String> {
        self.lock().report.as_ref().and_then(|r| r.warning_message())
    }

    async fn fire(&self, generation: u64) {
        let next = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            // Detach from the timer slot so later edits cannot abort the check
            inner.timer = None;
            if inner.in_flight {
                debug!("Collinearity check in flight; re-firing when it resolves");
                inner.refire = true;
                return;
            }
            let next = inner.checkable();
            inner.in_flight = next.is_some();
            next
        };

        if let Some((dataset_id, features)) = next {
            self.check_loop(dataset_id, features).await;
        }
    }

    async fn check_loop(&self, mut dataset_id: EntityId, mut features: Vec<String>) {
        loop {
            let response = self
                .backend
                .check_collinearity(CollinearityRequest {
                    dataset_id: dataset_id.clone(),
                    features: features.clone(),
                })
                .await;

            let next = {
                let mut inner = self.lock();
                if inner.features == features && inner.dataset_id.as_ref() == Some(&dataset_id) {
                    match response {
                        Ok(response) => inner.report = Some(response.into()),
                        Err(e) => warn!(error = %e, "Collinearity check failed"),
                    }
                } else {
                    debug!("Discarding collinearity response for superseded feature set");
                }

                let next = if inner.refire { inner.checkable() } else { None };
                inner.refire = false;
                inner.in_flight = next.is_some();
                next
            };

            match next {
                Some((d, f)) => {
                    dataset_id = d;
                    features = f;
                }
                None => break,
            }
        }
    }
}
