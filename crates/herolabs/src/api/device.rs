use serde::{Deserialize, Serialize};

use crate::api::null_as_default;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RadioConnection {
    Connected,
    Disconnected,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ValveState {
    Open,
    Closed,
    Opening,
    Closing,
    Faulty,
    PressureTest,
    RequestedOpen,
    RequestedClosed,
    #[serde(other)]
    Unknown,
}

impl ValveState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Closing => "closing",
            Self::Faulty => "faulty",
            Self::PressureTest => "pressure_test",
            Self::RequestedOpen => "requested_open",
            Self::RequestedClosed => "requested_closed",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BatteryState {
    High,
    Mid,
    Low,
    ExternalPowerSupply,
    #[serde(other)]
    Unknown,
}

impl BatteryState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Mid => "mid",
            Self::Low => "low",
            Self::ExternalPowerSupply => "external_power_supply",
            Self::Unknown => "unknown",
        }
    }
}

/// Device details, as returned by `GET /sonic/{id}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeviceInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub serial_no: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub radio_connection: RadioConnection,
    #[serde(default)]
    pub radio_rssi: Option<f64>,
    #[serde(default)]
    pub battery: Option<BatteryState>,
    #[serde(default)]
    pub auto_shut_off_enabled: Option<bool>,
    /// Offline auto shut-off usage time limit, in seconds. Zero disables the check.
    #[serde(default)]
    pub auto_shut_off_time_limit: Option<u32>,
    /// Offline auto shut-off volume limit, in millilitres. Zero disables the check.
    #[serde(default)]
    pub auto_shut_off_volume_limit: Option<u32>,
    /// The "Signal" hub relaying between wifi and the valve.
    #[serde(default)]
    pub signal_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub valve_state: Option<ValveState>,
}

/// Most recent measurements, as returned by `GET /sonic/{id}/telemetry`.
///
/// All values are in the smallest unit reported by the device.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Telemetry {
    /// Unix timestamp (seconds) of the measurement.
    #[serde(default)]
    pub probed_at: Option<i64>,
    /// Millilitres per minute.
    #[serde(default)]
    pub water_flow: Option<f64>,
    /// Millibar.
    #[serde(default)]
    pub pressure: Option<f64>,
    /// Degrees celsius.
    #[serde(default)]
    pub water_temp: Option<f64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ValveAction {
    Open,
    Close,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct ValveCommand {
    pub action: ValveAction,
}
