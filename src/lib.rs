//! # Perla Bridge - BWT water softener cloud portal bridge
//!
//! Polls the vendor's web portal (which has no public API) for one water
//! softener and republishes its status and consumption counters as a flat
//! sensor record for home automation.
//!
//! ## Features
//!
//! - **Session client**: cookie-based login, device lookup by serial number,
//!   HTML and JSON scraping with per-field tolerance
//! - **Coordinator**: two cadences on one timer, stale-data retention on
//!   partial failures, transparent re-authentication, reset-aware water
//!   increment
//! - **State API**: read-only HTTP endpoints over the latest snapshot
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `datetime`: Normalizes portal date strings to UTC
//! - `sensors`: Sensor key catalogue and value types
//! - `portal`: Session client for the vendor portal
//! - `coordinator`: Polling, merging and failure classification
//! - `web`: HTTP server and REST API

pub mod config;
pub mod coordinator;
pub mod datetime;
pub mod error;
pub mod logging;
pub mod portal;
pub mod sensors;
#[cfg(feature = "web")]
pub mod web;


// Re-export commonly used types
pub use config::Config;
pub use coordinator::{Coordinator, StateSnapshot};
pub use error::{PerlaError, Result};
pub use portal::{PortalApi, PortalClient};
pub use sensors::{SensorKey, SensorRecord, SensorValue};
