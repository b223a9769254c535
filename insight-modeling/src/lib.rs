//! insight-modeling library interface
//!
//! Orchestration layer between user edits to a model configuration and the
//! remote statistical service:
//! - [`catalog`]: dataset variables + health annotations → option list
//! - [`configuration`]: the mutable model configuration and derived option lists
//! - [`collinearity`]: debounced background multicollinearity screening
//! - [`runner`]: single-flight model execution
//! - [`projector`]: fit results → render-ready chart series
//! - [`comparison`] / [`reclassification`]: baseline snapshots, metric deltas, NRI/IDI
//! - [`assistant`]: AI suggestion and interpretation calls
//! - [`session`]: the facade tying all of the above to one workbench tab

pub mod assistant;
pub mod backend;
pub mod busy;
pub mod catalog;
pub mod collinearity;
pub mod comparison;
pub mod configuration;
pub mod error;
pub mod format;
pub mod methodology;
pub mod projector;
pub mod reclassification;
pub mod result;
pub mod runner;
pub mod session;

pub use crate::error::BackendError;
pub use crate::session::{ModelingSession, RunDisposition, SessionSettings};
