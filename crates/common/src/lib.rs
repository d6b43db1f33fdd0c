#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared types and utilities for the taskgraph execution core.
//!
//! This crate provides the data model (§3), error taxonomy (§7) and
//! configuration (§6) used by every other crate in the workspace.

pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;

/// Re-export commonly used external types.
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use serde_json::Value as Json;
