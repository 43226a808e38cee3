//! Polling coordinator
//!
//! Drives one fetch cycle per tick against a [`PortalApi`], merges the status
//! and consumption records into a single running state, derives the water
//! increment and publishes an immutable [`StateSnapshot`] for readers.

mod state;

pub use state::{StateSnapshot, WaterIncrement};

use crate::config::{Config, PollingConfig};
use crate::error::{PerlaError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::portal::{PortalApi, PortalClient};
use crate::sensors::{SensorKey, SensorRecord, SensorValue};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

/// A tick with fewer populated keys than this is not trusted
const MIN_POPULATED_KEYS: usize = 3;

/// Which sub-fetch a failure came from
#[derive(Debug, Clone, Copy)]
enum Source {
    Status,
    Consumption,
}

impl Source {
    fn label(self) -> &'static str {
        match self {
            Source::Status => "main data",
            Source::Consumption => "consumption data",
        }
    }
}

/// Owns the session client, the refresh cadence and the merged state
pub struct Coordinator {
    client: Box<dyn PortalApi>,
    status_interval: Duration,
    consumption_interval: Duration,
    device_key: Option<String>,
    last_status_update: Option<Instant>,
    data: SensorRecord,
    water: WaterIncrement,

    last_update_success: bool,
    last_error: Option<String>,
    last_success_at: Option<chrono::DateTime<chrono::Utc>>,
    consecutive_failures: u32,
    total_ticks: u64,

    snapshot_tx: watch::Sender<Arc<StateSnapshot>>,
    closed: bool,
    logger: StructuredLogger,
}

impl Coordinator {
    pub fn new(client: Box<dyn PortalApi>, polling: &PollingConfig) -> Self {
        Self::with_intervals(
            client,
            Duration::from_secs(polling.status_interval_secs),
            Duration::from_secs(polling.consumption_interval_secs),
        )
    }

    /// Build a coordinator around a real portal client for `config`
    pub fn from_config(config: &Config) -> Self {
        let client = PortalClient::new(config.account.clone(), &config.portal);
        let mut coordinator = Self::new(Box::new(client), &config.polling);
        coordinator.logger = get_logger_with_context(
            LogContext::new("coordinator").with_field("device", config.device_name.clone()),
        );
        coordinator
    }

    /// Cadences are taken as given; range checks live in `Config::validate`
    pub fn with_intervals(
        client: Box<dyn PortalApi>,
        status_interval: Duration,
        consumption_interval: Duration,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(StateSnapshot::default()));
        Self {
            client,
            status_interval,
            consumption_interval,
            device_key: None,
            last_status_update: None,
            data: SensorRecord::new(),
            water: WaterIncrement::default(),
            last_update_success: false,
            last_error: None,
            last_success_at: None,
            consecutive_failures: 0,
            total_ticks: 0,
            snapshot_tx,
            closed: false,
            logger: get_logger_with_context(LogContext::new("coordinator")),
        }
    }

    /// Receiver for the snapshot published after every tick
    pub fn subscribe(&self) -> watch::Receiver<Arc<StateSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn data(&self) -> &SensorRecord {
        &self.data
    }

    pub fn device_key(&self) -> Option<&str> {
        self.device_key.as_deref()
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success
    }

    /// Last tick succeeded and there is data to show
    pub fn available(&self) -> bool {
        self.last_update_success && !self.data.is_empty()
    }

    /// Run one fetch cycle now
    pub async fn refresh(&mut self) -> Result<()> {
        self.refresh_at(Instant::now()).await
    }

    pub(crate) async fn refresh_at(&mut self, now: Instant) -> Result<()> {
        self.total_ticks = self.total_ticks.saturating_add(1);
        let outcome = self.update(now).await.map_err(unify);

        match &outcome {
            Ok(()) => {
                self.last_update_success = true;
                self.last_error = None;
                self.last_success_at = Some(chrono::Utc::now());
                self.consecutive_failures = 0;
            }
            Err(e) => {
                self.last_update_success = false;
                self.last_error = Some(e.to_string());
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            }
        }
        self.publish();
        outcome
    }

    async fn update(&mut self, now: Instant) -> Result<()> {
        // A cached key is only usable while the client still holds its session
        let cached = self
            .device_key
            .clone()
            .filter(|_| self.client.is_authenticated());
        let device_key = match cached {
            Some(key) => key,
            None => match self.client.authenticate().await {
                Ok(key) => {
                    self.device_key = Some(key.clone());
                    key
                }
                Err(e) => {
                    self.device_key = None;
                    return Err(e);
                }
            },
        };

        if self.status_due(now) {
            let fetched = self.client.fetch_status(&device_key).await;
            if let Some(record) = self.accept(fetched, Source::Status)? {
                self.data.extend(record);
                self.last_status_update = Some(now);
            }
        }

        let fetched = self.client.fetch_consumption(&device_key).await;
        if let Some(record) = self.accept(fetched, Source::Consumption)? {
            self.data.extend(record);
        }

        if let Some(current) = self
            .data
            .get(&SensorKey::WaterConsumption)
            .and_then(SensorValue::as_i64)
        {
            let increment = self.water.observe(current);
            self.data.insert(SensorKey::WaterIncrement, SensorValue::Int(increment));
        }

        if self.data.len() < MIN_POPULATED_KEYS {
            return Err(PerlaError::insufficient_data(format!(
                "{} of {} required values populated",
                self.data.len(),
                MIN_POPULATED_KEYS
            )));
        }

        self.logger.debug(&format!(
            "Tick complete: {} values, water increment {:?}",
            self.data.len(),
            self.data.get(&SensorKey::WaterIncrement)
        ));
        Ok(())
    }

    fn status_due(&self, now: Instant) -> bool {
        match self.last_status_update {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.status_interval,
        }
    }

    /// Classify a sub-fetch result: auth failures end the tick and drop the
    /// device key, anything else keeps the stale data.
    fn accept(
        &mut self,
        fetched: Result<SensorRecord>,
        source: Source,
    ) -> Result<Option<SensorRecord>> {
        match fetched {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_auth() => {
                self.device_key = None;
                Err(e)
            }
            Err(e) => {
                self.logger.warn(&format!("Failed to update {}: {}", source.label(), e));
                Ok(None)
            }
        }
    }

    fn publish(&self) {
        let snapshot = StateSnapshot {
            data: self.data.clone(),
            available: self.available(),
            last_update_success: self.last_update_success,
            last_error: self.last_error.clone(),
            last_success_at: self.last_success_at,
            consecutive_failures: self.consecutive_failures,
            total_ticks: self.total_ticks,
        };
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }

    /// Poll at the consumption cadence until `shutdown` resolves, then close
    /// the session. The first tick runs immediately.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = interval(self.consumption_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.logger.info(&format!(
            "Polling every {}s, status every {}s",
            self.consumption_interval.as_secs(),
            self.status_interval.as_secs()
        ));

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {}
            }
            // An in-flight tick is dropped rather than awaited on shutdown
            tokio::select! {
                _ = &mut shutdown => {
                    self.logger.info("Shutdown signal received during update");
                    break;
                }
                result = self.refresh() => {
                    if let Err(e) = result {
                        self.logger.error(&format!("Update cycle failed: {}", e));
                    }
                }
            }
        }

        self.shutdown().await;
    }

    /// Close the session client. Only the first call has any effect.
    pub async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.client.close().await;
        self.logger.info("Coordinator shutdown complete");
    }
}

/// Collapse every failure kind into `UpdateFailed`, keeping the cause's text
fn unify(err: PerlaError) -> PerlaError {
    match err {
        PerlaError::UpdateFailed { .. } => err,
        PerlaError::InsufficientData { message } => {
            PerlaError::update_failed(format!("Insufficient data received: {}", message))
        }
        other => PerlaError::update_failed(format!("Error communicating with API: {}", other)),
    }
}
