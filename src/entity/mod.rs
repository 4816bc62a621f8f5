//! Entities presented to the hub.
//!
//! Entities hold no authoritative state of their own. Sensors and binary
//! sensors are projections of a coordinator snapshot, and switches keep a
//! single boolean that is overwritten from the snapshot after every tick.

pub mod binary_sensor;
pub mod registry;
pub mod sensor;
pub mod switch;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::coordinator::{DeviceCoordinator, ListenerHandle, PropertyCoordinator};

#[derive(Clone, Copy, Debug, Serialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sensor,
    BinarySensor,
    Switch,
}

#[derive(Clone, Copy, Debug, Serialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Config,
    Diagnostic,
}

/// Device registry entry the entity belongs to.
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub struct DeviceRegistryInfo {
    pub domain: &'static str,
    pub identifier: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub struct EntityInfo {
    pub unique_id: String,
    pub name: &'static str,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EntityCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SensorValue {
    Unknown,
    Float(f64),
    Integer(i64),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum EntityState {
    Sensor(SensorValue),
    BinarySensor(Option<bool>),
    Switch(bool),
}

/// Coordinator an entity reads from.
#[derive(Clone)]
pub enum Backing {
    Device(Arc<DeviceCoordinator>),
    Property(Arc<PropertyCoordinator>),
}

impl Backing {
    /// `{serial}_{key}` for device entities, `{property id}_{key}` for
    /// property entities.
    #[must_use]
    pub fn unique_id(&self, key: &str) -> String {
        match self {
            Self::Device(dev) => {
                let serial = dev.serial_number().unwrap_or_else(|| dev.id().to_string());
                format!("{serial}_{key}")
            }
            Self::Property(prop) => format!("{}_{key}", prop.id()),
        }
    }

    #[must_use]
    pub fn device_info(&self) -> DeviceRegistryInfo {
        match self {
            Self::Device(dev) => DeviceRegistryInfo {
                domain: crate::DOMAIN,
                identifier: dev.id().to_string(),
                manufacturer: dev.manufacturer(),
                model: dev.model(),
                name: format!("Sonic Device: {}", dev.device_name()),
            },
            Self::Property(prop) => DeviceRegistryInfo {
                domain: crate::DOMAIN,
                identifier: prop.id().to_string(),
                manufacturer: herolabs::MANUFACTURER,
                model: herolabs::PROPERTY_MODEL,
                name: format!(
                    "Sonic Property Settings: {}",
                    prop.property_name().unwrap_or_default()
                ),
            },
        }
    }

    /// Device entities follow the coordinator. Property entities only
    /// require a property id, and ignore tick failures.
    #[must_use]
    pub fn available(&self) -> bool {
        match self {
            Self::Device(dev) => dev.available(),
            Self::Property(prop) => !prop.id().is_empty(),
        }
    }

    pub fn add_listener(&self, callback: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        match self {
            Self::Device(dev) => dev.add_listener(callback),
            Self::Property(prop) => prop.add_listener(callback),
        }
    }
}

pub trait Entity: Send + Sync {
    fn info(&self) -> &EntityInfo;

    fn backing(&self) -> &Backing;

    fn state(&self) -> EntityState;

    /// Called from the coordinator listener, before the new state is published.
    fn on_coordinator_update(&self) {}

    fn available(&self) -> bool {
        self.backing().available()
    }

    fn device_info(&self) -> DeviceRegistryInfo {
        self.backing().device_info()
    }

    fn view(&self) -> EntityView {
        EntityView {
            info: self.info().clone(),
            device: self.device_info(),
            available: self.available(),
            state: self.state(),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct EntityView {
    #[serde(flatten)]
    pub info: EntityInfo,
    pub device: DeviceRegistryInfo,
    pub available: bool,
    pub state: EntityState,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct StateEvent {
    pub unique_id: String,
    pub available: bool,
    pub state: EntityState,
}

/// Broadcast channel carrying entity state changes to the hub.
#[derive(Clone, Debug)]
pub struct StateBus {
    tx: broadcast::Sender<StateEvent>,
}

impl StateBus {
    const BUFFER_SIZE: usize = 128;

    #[must_use]
    pub fn new() -> Self {
        Self {
            tx: broadcast::Sender::new(Self::BUFFER_SIZE),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, entity: &dyn Entity) {
        let event = StateEvent {
            unique_id: entity.info().unique_id.clone(),
            available: entity.available(),
            state: entity.state(),
        };
        log::trace!("State update: {event:?}");
        // no subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for StateBus {
    fn default() -> Self {
        Self::new()
    }
}
