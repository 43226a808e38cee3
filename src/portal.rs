//! Vendor portal integration
//!
//! The portal has no API: login is a form post guarded by a session cookie,
//! the device is located by scraping the dashboard, status comes from an
//! ad-hoc JSON endpoint and consumption from a re-rendered HTML component.

pub mod client;
pub mod scrape;
pub mod types;

pub use client::{PortalClient, SessionState};
pub use types::{ChartAttributes, ConsumptionRow, Endpoints, RowOrder};

use crate::error::Result;
use crate::sensors::SensorRecord;

/// Session client seam used by the coordinator.
///
/// Implementations report `Auth` for rejected or expired sessions,
/// `Connection` for network failures and timeouts, and `Api` for any
/// unexpected portal content.
#[async_trait::async_trait]
pub trait PortalApi: Send {
    /// Log in and return the device key for the configured serial number
    async fn authenticate(&mut self) -> Result<String>;

    /// Slow-changing device status
    async fn fetch_status(&mut self, device_key: &str) -> Result<SensorRecord>;

    /// Fast-changing consumption counters; empty when the device has no chart yet
    async fn fetch_consumption(&mut self, device_key: &str) -> Result<SensorRecord>;

    fn is_authenticated(&self) -> bool;

    /// Release the HTTP session. Safe to call more than once.
    async fn close(&mut self);
}
