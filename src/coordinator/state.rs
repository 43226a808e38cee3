use crate::sensors::{SensorKey, SensorRecord, SensorValue};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Reset-aware delta tracker for the water consumption counter
#[derive(Debug, Clone, Copy, Default)]
pub struct WaterIncrement {
    prev: i64,
}

impl WaterIncrement {
    /// Record `current` and return the usage since the previous observation.
    ///
    /// No baseline yet (`prev == 0`) yields 0. A counter that went backwards
    /// is taken as a restart from zero, so the whole current value counts.
    pub fn observe(&mut self, current: i64) -> i64 {
        let increment = if self.prev == 0 {
            0
        } else if current < self.prev {
            current
        } else {
            current - self.prev
        };
        self.prev = current;
        increment
    }

    pub fn previous(&self) -> i64 {
        self.prev
    }
}

/// Read-only view of the coordinator published after every tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct StateSnapshot {
    /// Merged status and consumption values
    pub data: SensorRecord,
    /// Last tick succeeded and there is something to show
    pub available: bool,
    pub last_update_success: bool,
    /// Description of the last unified failure, cleared on success
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub total_ticks: u64,
}

impl StateSnapshot {
    pub fn get(&self, key: SensorKey) -> Option<&SensorValue> {
        self.data.get(&key)
    }
}
