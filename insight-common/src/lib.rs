//! # Insight Common Library
//!
//! Shared code for the Insight modeling workbench crates:
//! - Error types
//! - Configuration loading (TOML + environment layering)
//! - Logging initialisation
//! - User-notice event bus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{Notice, NoticeBus, NoticeLevel};
