use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::coordinator::{DeviceCoordinator, PropertyCoordinator};
use crate::entity::{Backing, Entity, EntityCategory, EntityInfo, EntityState, Platform, SensorValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceSensor {
    FlowRate,
    Temperature,
    Pressure,
    Battery,
    TelemetryTime,
    ValveState,
    Status,
    AutoShutOffTimeLimit,
    AutoShutOffVolumeLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertySensor {
    LongFlowNotificationDelay,
    HighVolumeThreshold,
}

/// Rounds to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Integer division by `div`, rounding halves up.
fn div_round(value: u32, div: u32) -> i64 {
    i64::from(value.saturating_add(div / 2) / div)
}

/// Converts a unix timestamp (seconds) to local time in `tz`.
pub fn local_time<Z: TimeZone>(timestamp: i64, tz: &Z) -> Option<DateTime<FixedOffset>> {
    let utc = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
    Some(utc.with_timezone(tz).fixed_offset())
}

impl DeviceSensor {
    pub const ALL: [Self; 9] = [
        Self::FlowRate,
        Self::Temperature,
        Self::Pressure,
        Self::Battery,
        Self::TelemetryTime,
        Self::ValveState,
        Self::Status,
        Self::AutoShutOffTimeLimit,
        Self::AutoShutOffVolumeLimit,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::FlowRate => "current_flow_rate",
            Self::Temperature => "temperature",
            Self::Pressure => "water_pressure",
            Self::Battery => "battery",
            Self::TelemetryTime => "telemetry_time",
            Self::ValveState => "valve_state",
            Self::Status => "device_status",
            Self::AutoShutOffTimeLimit => "auto_shut_off_time_limit",
            Self::AutoShutOffVolumeLimit => "auto_shut_off_volume_limit",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FlowRate => "Water Flow Rate",
            Self::Temperature => "Water Temperature",
            Self::Pressure => "Water Pressure",
            Self::Battery => "Battery",
            Self::TelemetryTime => "Telemetry Data Timestamp",
            Self::ValveState => "Current Valve State",
            Self::Status => "Sonic Status Message",
            Self::AutoShutOffTimeLimit => "Auto Shut Off Time Limit",
            Self::AutoShutOffVolumeLimit => "Auto Shut Off Volume Limit",
        }
    }

    #[must_use]
    pub const fn unit(self) -> Option<&'static str> {
        match self {
            Self::FlowRate => Some("L/min"),
            Self::Temperature => Some("°C"),
            Self::Pressure => Some("bar"),
            Self::AutoShutOffTimeLimit => Some("min"),
            Self::AutoShutOffVolumeLimit => Some("L"),
            Self::Battery | Self::TelemetryTime | Self::ValveState | Self::Status => None,
        }
    }

    #[must_use]
    pub const fn category(self) -> Option<EntityCategory> {
        match self {
            Self::TelemetryTime
            | Self::Status
            | Self::AutoShutOffTimeLimit
            | Self::AutoShutOffVolumeLimit => Some(EntityCategory::Diagnostic),
            _ => None,
        }
    }

    fn value(self, dev: &DeviceCoordinator, tz: Option<&tzfile::Tz>) -> Option<SensorValue> {
        let value = match self {
            Self::FlowRate => SensorValue::Float(round1(dev.current_flow_rate()? / 1000.0)),
            Self::Temperature => SensorValue::Float(round1(dev.temperature()?)),
            Self::Pressure => SensorValue::Float(round1(dev.current_mbar()? / 1000.0)),
            Self::Battery => SensorValue::Text(dev.battery_state()?.as_str().to_string()),
            Self::TelemetryTime => {
                let ts = dev.last_heard_from_time()?;
                SensorValue::Timestamp(match tz {
                    Some(tz) => local_time(ts, &tz)?,
                    None => local_time(ts, &Utc)?,
                })
            }
            Self::ValveState => {
                // a valve state without a measurement time is stale
                dev.last_heard_from_time().filter(|ts| *ts != 0)?;
                SensorValue::Text(dev.valve_state()?.as_str().to_string())
            }
            Self::Status => SensorValue::Text(dev.status().filter(|s| !s.is_empty())?),
            Self::AutoShutOffTimeLimit => {
                SensorValue::Integer(div_round(dev.auto_shut_off_time_limit()?, 60))
            }
            Self::AutoShutOffVolumeLimit => {
                SensorValue::Integer(div_round(dev.auto_shut_off_volume_limit()?, 1000))
            }
        };
        Some(value)
    }
}

impl PropertySensor {
    pub const ALL: [Self; 2] = [Self::LongFlowNotificationDelay, Self::HighVolumeThreshold];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::LongFlowNotificationDelay => "property_long_flow_notification_delay_mins",
            Self::HighVolumeThreshold => "property_high_volume_threshold_litres",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LongFlowNotificationDelay => "Long Flow Notification Time Delay",
            Self::HighVolumeThreshold => "High Volume Notification Threshold",
        }
    }

    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::LongFlowNotificationDelay => "min",
            Self::HighVolumeThreshold => "L",
        }
    }

    fn value(self, prop: &PropertyCoordinator) -> Option<SensorValue> {
        let value = match self {
            Self::LongFlowNotificationDelay => prop.long_flow_notification_delay_mins()?,
            Self::HighVolumeThreshold => prop.high_volume_threshold_litres()?,
        };
        Some(SensorValue::Integer(i64::from(value)))
    }
}

enum Source {
    Device(Arc<DeviceCoordinator>, DeviceSensor, Option<Arc<tzfile::Tz>>),
    Property(Arc<PropertyCoordinator>, PropertySensor),
}

/// Read-only projection of one cached field.
pub struct Sensor {
    info: EntityInfo,
    backing: Backing,
    source: Source,
}

impl Sensor {
    /// Telemetry timestamps are rendered in `timezone`, or UTC if none is given.
    #[must_use]
    pub fn device(
        dev: Arc<DeviceCoordinator>,
        sensor: DeviceSensor,
        timezone: Option<Arc<tzfile::Tz>>,
    ) -> Self {
        let backing = Backing::Device(dev.clone());
        let info = EntityInfo {
            unique_id: backing.unique_id(sensor.key()),
            name: sensor.name(),
            platform: Platform::Sensor,
            category: sensor.category(),
            unit: sensor.unit(),
        };
        Self {
            info,
            backing,
            source: Source::Device(dev, sensor, timezone),
        }
    }

    #[must_use]
    pub fn property(prop: Arc<PropertyCoordinator>, sensor: PropertySensor) -> Self {
        let backing = Backing::Property(prop.clone());
        let info = EntityInfo {
            unique_id: backing.unique_id(sensor.key()),
            name: sensor.name(),
            platform: Platform::Sensor,
            category: Some(EntityCategory::Diagnostic),
            unit: Some(sensor.unit()),
        };
        Self {
            info,
            backing,
            source: Source::Property(prop, sensor),
        }
    }

    #[must_use]
    pub fn value(&self) -> SensorValue {
        let value = match &self.source {
            Source::Device(dev, sensor, tz) => sensor.value(dev, tz.as_deref()),
            Source::Property(prop, sensor) => sensor.value(prop),
        };
        value.unwrap_or(SensorValue::Unknown)
    }
}

impl Entity for Sensor {
    fn info(&self) -> &EntityInfo {
        &self.info
    }

    fn backing(&self) -> &Backing {
        &self.backing
    }

    fn state(&self) -> EntityState {
        EntityState::Sensor(self.value())
    }
}
