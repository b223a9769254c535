//! Test Helper Utilities
//!
//! Shared fixtures for insight-modeling integration tests

#![allow(dead_code)]

pub mod fake_backend;

pub use fake_backend::FakeBackend;

use insight_common::{Notice, NoticeBus};
use insight_modeling::backend::EntityId;
use insight_modeling::catalog::{DatasetMetadata, VariableMeta, VariableType};
use insight_modeling::result::ModelResult;
use insight_modeling::{ModelingSession, SessionSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

pub fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn metadata() -> DatasetMetadata {
    DatasetMetadata::new(vec![
        VariableMeta::new("Y", VariableType::Binary),
        VariableMeta::new("Age", VariableType::Continuous),
        VariableMeta::new("Sex", VariableType::Categorical).with_categories(["M", "F"]),
        VariableMeta::new("BMI", VariableType::Float),
        VariableMeta::new("Time", VariableType::Int),
        VariableMeta::new("Status", VariableType::Binary),
    ])
}

pub fn result_from(value: serde_json::Value) -> ModelResult {
    serde_json::from_value(value).unwrap()
}

/// Session on a fresh fake backend, dataset 1 selected
pub fn session() -> (Arc<FakeBackend>, ModelingSession, Receiver<Notice>) {
    let backend = Arc::new(FakeBackend::new());
    let notices = NoticeBus::new(32);
    let rx = notices.subscribe();
    let session = ModelingSession::new(
        backend.clone(),
        notices,
        EntityId::Int(7),
        SessionSettings::default(),
    );
    session.set_dataset(Some(EntityId::Int(1)));
    (backend, session, rx)
}

/// Everything emitted so far
pub fn drain(rx: &mut Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}
