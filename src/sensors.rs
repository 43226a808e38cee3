//! Sensor catalogue shared by the portal client, the coordinator and the
//! state API.
//!
//! The key set is closed: anything the portal returns outside of it is
//! dropped during parsing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Flat record of sensor values keyed by sensor
pub type SensorRecord = BTreeMap<SensorKey, SensorValue>;

/// Every value the bridge can publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKey {
    // device status
    Online,
    Standby,
    Salt,
    ResinVol,
    InHardness,
    OutHardness,
    Pressure,
    VolOk,
    WifiSignal,
    // consumption
    LastDate,
    LastUpdate,
    RefreshDate,
    RegenCount,
    PowerOutage,
    WaterConsumption,
    SaltAlarm,
    SaltPerRegen,
    SaltConsumption,
    // derived
    WaterIncrement,
}

impl SensorKey {
    pub const ALL: [SensorKey; 19] = [
        SensorKey::Online,
        SensorKey::Standby,
        SensorKey::Salt,
        SensorKey::ResinVol,
        SensorKey::InHardness,
        SensorKey::OutHardness,
        SensorKey::Pressure,
        SensorKey::VolOk,
        SensorKey::WifiSignal,
        SensorKey::LastDate,
        SensorKey::LastUpdate,
        SensorKey::RefreshDate,
        SensorKey::RegenCount,
        SensorKey::PowerOutage,
        SensorKey::WaterConsumption,
        SensorKey::SaltAlarm,
        SensorKey::SaltPerRegen,
        SensorKey::SaltConsumption,
        SensorKey::WaterIncrement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Standby => "standby",
            Self::Salt => "salt",
            Self::ResinVol => "resin_vol",
            Self::InHardness => "in_hardness",
            Self::OutHardness => "out_hardness",
            Self::Pressure => "pressure",
            Self::VolOk => "vol_ok",
            Self::WifiSignal => "wifi_signal",
            Self::LastDate => "last_date",
            Self::LastUpdate => "last_update",
            Self::RefreshDate => "refresh_date",
            Self::RegenCount => "regen_count",
            Self::PowerOutage => "power_outage",
            Self::WaterConsumption => "water_consumption",
            Self::SaltAlarm => "salt_alarm",
            Self::SaltPerRegen => "salt_per_regen",
            Self::SaltConsumption => "salt_consumption",
            Self::WaterIncrement => "water_increment",
        }
    }

    /// Map a portal summary `code` onto a sensor, if it is one we publish
    pub fn from_status_code(code: &str) -> Option<Self> {
        match code {
            "resinVol" => Some(Self::ResinVol),
            "inHardness" => Some(Self::InHardness),
            "outHardness" => Some(Self::OutHardness),
            "pressure" => Some(Self::Pressure),
            "salt" => Some(Self::Salt),
            "volOK" => Some(Self::VolOk),
            "rssiLevel" => Some(Self::WifiSignal),
            _ => None,
        }
    }

    pub fn descriptor(&self) -> SensorDescriptor {
        let d = SensorDescriptor::new(*self);
        match self {
            Self::Online => d
                .named("Online")
                .class("connectivity")
                .icon("mdi:lan-connect")
                .binary(),
            Self::Standby => d
                .named("Holiday Mode")
                .class("running")
                .icon("mdi:power-sleep")
                .binary(),
            Self::SaltAlarm => d
                .named("Salt Alarm")
                .class("problem")
                .icon("mdi:alert")
                .binary(),
            Self::PowerOutage => d
                .named("Power Outage")
                .class("problem")
                .icon("mdi:power-plug-off")
                .binary(),
            Self::Salt => d
                .named("Salt per Regeneration")
                .unit("g")
                .class("weight")
                .state("measurement")
                .icon("mdi:shaker"),
            Self::ResinVol => d
                .named("Resin Volume")
                .unit("L")
                .state("measurement")
                .icon("mdi:water"),
            Self::InHardness => d
                .named("Inlet Hardness")
                .unit("°f")
                .state("measurement")
                .icon("mdi:water-opacity"),
            Self::OutHardness => d
                .named("Outlet Hardness")
                .unit("°f")
                .state("measurement")
                .icon("mdi:water-check"),
            Self::Pressure => d
                .named("Pressure")
                .unit("bar")
                .class("pressure")
                .state("measurement")
                .icon("mdi:gauge"),
            Self::WifiSignal => d
                .named("WiFi Signal")
                .unit("dBm")
                .class("signal_strength")
                .state("measurement")
                .icon("mdi:wifi"),
            Self::VolOk => d
                .named("Softened Water Volume")
                .unit("L")
                .class("water")
                .state("total")
                .icon("mdi:water-check"),
            Self::WaterConsumption => d
                .named("Water Consumption")
                .unit("L")
                .class("water")
                .state("total_increasing")
                .icon("mdi:water"),
            Self::WaterIncrement => d
                .named("Water Increment")
                .unit("L")
                .state("measurement")
                .icon("mdi:water-plus"),
            Self::RegenCount => d
                .named("Regenerations")
                .state("total_increasing")
                .icon("mdi:refresh"),
            Self::SaltPerRegen => d
                .named("Salt Dose per Regeneration")
                .unit("g")
                .class("weight")
                .state("measurement")
                .icon("mdi:shaker"),
            Self::SaltConsumption => d
                .named("Salt Consumption")
                .unit("g")
                .class("weight")
                .state("total_increasing")
                .icon("mdi:shaker-outline"),
            Self::LastDate => d.named("Last Measurement Day").icon("mdi:calendar"),
            Self::LastUpdate => d
                .named("Last Measurement Date")
                .class("timestamp")
                .icon("mdi:calendar-clock"),
            Self::RefreshDate => d
                .named("Last Data Refresh")
                .class("timestamp")
                .icon("mdi:update"),
        }
    }
}

impl std::fmt::Display for SensorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single published value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// `None` when the portal sent a date that did not parse
    Timestamp(Option<DateTime<Utc>>),
}

impl SensorValue {
    /// Convert a JSON scalar from the portal; `null`, arrays and objects are rejected
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Presentation metadata for one sensor
#[derive(Debug, Clone, Serialize)]
pub struct SensorDescriptor {
    pub key: SensorKey,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
    pub icon: &'static str,
    pub binary: bool,
}

impl SensorDescriptor {
    fn new(key: SensorKey) -> Self {
        Self {
            key,
            name: key.as_str(),
            unit: None,
            device_class: None,
            state_class: None,
            icon: "mdi:water",
            binary: false,
        }
    }

    fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    fn class(mut self, class: &'static str) -> Self {
        self.device_class = Some(class);
        self
    }

    fn state(mut self, state: &'static str) -> Self {
        self.state_class = Some(state);
        self
    }

    fn icon(mut self, icon: &'static str) -> Self {
        self.icon = icon;
        self
    }

    fn binary(mut self) -> Self {
        self.binary = true;
        self
    }
}
