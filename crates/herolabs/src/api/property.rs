use serde::{Deserialize, Serialize};

use crate::api::null_as_default;

/// Property details, as returned by `GET /property/{id}`.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PropertyDetails {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct PropertySettings {
    #[serde(default)]
    pub auto_shut_off: Option<bool>,
    #[serde(default)]
    pub pressure_tests_enabled: Option<bool>,
    /// Daily pressure test time, `HH:MM:SS` (24h clock).
    #[serde(default)]
    pub pressure_tests_schedule: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct NotificationSettings {
    #[serde(default)]
    pub cloud_disconnection: Option<bool>,
    #[serde(default)]
    pub device_handle_moved: Option<bool>,
    #[serde(default)]
    pub health_check_failed: Option<bool>,
    #[serde(default)]
    pub low_battery_level: Option<bool>,
    #[serde(default)]
    pub pressure_test_failed: Option<bool>,
    #[serde(default)]
    pub pressure_test_skipped: Option<bool>,
    #[serde(default)]
    pub radio_disconnection: Option<bool>,
    #[serde(default)]
    pub legionella_risk: Option<bool>,
    #[serde(default)]
    pub low_water_temperature: Option<bool>,
    #[serde(default)]
    pub high_volume_threshold_litres: Option<u32>,
    #[serde(default)]
    pub long_flow_notification_delay_mins: Option<u32>,
}

/// Partial update for `PUT /property/{id}/settings`. Only fields that are set
/// are sent.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct PropertySettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_shut_off: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure_tests_enabled: Option<bool>,
}

impl PropertySettingsUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_auto_shut_off(self, auto_shut_off: bool) -> Self {
        Self {
            auto_shut_off: Some(auto_shut_off),
            ..self
        }
    }

    #[must_use]
    pub const fn with_pressure_tests_enabled(self, enabled: bool) -> Self {
        Self {
            pressure_tests_enabled: Some(enabled),
            ..self
        }
    }
}

/// Partial update for `PUT /property/{id}/notification_settings`.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct NotificationSettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_disconnection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_handle_moved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_failed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_battery_level: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure_test_failed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure_test_skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radio_disconnection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legionella_risk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_water_temperature: Option<bool>,
}

impl NotificationSettingsUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
