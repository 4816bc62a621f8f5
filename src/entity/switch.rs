use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use herolabs::api::{NotificationSettingsUpdate, PropertySettingsUpdate, ValveState};
use herolabs::client::SonicApi;
use herolabs::error::HeroLabsResult;

use crate::coordinator::{DeviceCoordinator, PropertyCoordinator, PropertySnapshot};
use crate::entity::{Backing, Entity, EntityCategory, EntityInfo, EntityState, Platform, StateBus};
use crate::error::ApiResult;

/// Property settings exposed as toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertySwitch {
    AutoShutOff,
    PressureTests,
    CloudDisconnection,
    LowBatteryLevel,
    LegionellaCheck,
    LowWaterTemperature,
    DeviceHandleMoved,
    HealthCheckFailed,
    PressureTestFailed,
    PressureTestSkipped,
    RadioDisconnection,
}

impl PropertySwitch {
    pub const ALL: [Self; 11] = [
        Self::AutoShutOff,
        Self::PressureTests,
        Self::CloudDisconnection,
        Self::LowBatteryLevel,
        Self::LegionellaCheck,
        Self::LowWaterTemperature,
        Self::DeviceHandleMoved,
        Self::HealthCheckFailed,
        Self::PressureTestFailed,
        Self::PressureTestSkipped,
        Self::RadioDisconnection,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::AutoShutOff => "auto_shutoff_switch",
            Self::PressureTests => "pressure_tests_enabled",
            Self::CloudDisconnection => "cloud_disconnection_alert",
            Self::LowBatteryLevel => "low_battery_level_alert",
            Self::LegionellaCheck => "legionella_check_alert",
            Self::LowWaterTemperature => "low_water_temperature_alert",
            Self::DeviceHandleMoved => "device_handle_moved_alert",
            Self::HealthCheckFailed => "health_check_failed_alert",
            Self::PressureTestFailed => "pressure_test_failed_alert",
            Self::PressureTestSkipped => "pressure_test_skipped_alert",
            Self::RadioDisconnection => "radio_disconnection_alert",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AutoShutOff => "Automatic Shutoff Setting",
            Self::PressureTests => "Pressure Tests Setting",
            Self::CloudDisconnection => "Alerts - Cloud Disconnection",
            Self::LowBatteryLevel => "Alerts - Low Battery Level",
            Self::LegionellaCheck => "Alerts - Legionella Check",
            Self::LowWaterTemperature => "Alerts - Low Water Temperature",
            Self::DeviceHandleMoved => "Alerts - Valve Position",
            Self::HealthCheckFailed => "Alerts - Health Check Failed",
            Self::PressureTestFailed => "Alerts - Pressure Test Failed",
            Self::PressureTestSkipped => "Alerts - Pressure Test Skipped",
            Self::RadioDisconnection => "Alerts - Radio Disconnection",
        }
    }

    fn read(self, snap: &PropertySnapshot) -> Option<bool> {
        let notif = &snap.notifications;
        match self {
            Self::AutoShutOff => snap.settings.auto_shut_off,
            Self::PressureTests => snap.settings.pressure_tests_enabled,
            Self::CloudDisconnection => notif.cloud_disconnection,
            Self::LowBatteryLevel => notif.low_battery_level,
            Self::LegionellaCheck => notif.legionella_risk,
            Self::LowWaterTemperature => notif.low_water_temperature,
            Self::DeviceHandleMoved => notif.device_handle_moved,
            Self::HealthCheckFailed => notif.health_check_failed,
            Self::PressureTestFailed => notif.pressure_test_failed,
            Self::PressureTestSkipped => notif.pressure_test_skipped,
            Self::RadioDisconnection => notif.radio_disconnection,
        }
    }

    fn notification_update(self, on: bool) -> Option<NotificationSettingsUpdate> {
        let mut upd = NotificationSettingsUpdate::new();
        let field = match self {
            Self::AutoShutOff | Self::PressureTests => return None,
            Self::CloudDisconnection => &mut upd.cloud_disconnection,
            Self::LowBatteryLevel => &mut upd.low_battery_level,
            Self::LegionellaCheck => &mut upd.legionella_risk,
            Self::LowWaterTemperature => &mut upd.low_water_temperature,
            Self::DeviceHandleMoved => &mut upd.device_handle_moved,
            Self::HealthCheckFailed => &mut upd.health_check_failed,
            Self::PressureTestFailed => &mut upd.pressure_test_failed,
            Self::PressureTestSkipped => &mut upd.pressure_test_skipped,
            Self::RadioDisconnection => &mut upd.radio_disconnection,
        };
        *field = Some(on);
        Some(upd)
    }

    async fn write(self, api: &dyn SonicApi, id: &str, on: bool) -> HeroLabsResult<()> {
        match self {
            Self::AutoShutOff => {
                let upd = PropertySettingsUpdate::new().with_auto_shut_off(on);
                api.update_property_settings(id, &upd).await
            }
            Self::PressureTests => {
                let upd = PropertySettingsUpdate::new().with_pressure_tests_enabled(on);
                api.update_property_settings(id, &upd).await
            }
            _ => match self.notification_update(on) {
                Some(upd) => api.update_notification_settings(id, &upd).await,
                None => Ok(()),
            },
        }
    }
}

enum Source {
    Valve(Arc<DeviceCoordinator>),
    Property(Arc<PropertyCoordinator>, PropertySwitch),
}

impl Source {
    /// Switch position according to the cached snapshot. Absent values read
    /// as off.
    fn compute(&self) -> bool {
        match self {
            Self::Valve(dev) => dev.valve_state() == Some(ValveState::Open),
            Self::Property(prop, sw) => prop
                .snapshot()
                .and_then(|snap| sw.read(&snap))
                .unwrap_or(false),
        }
    }
}

/// A toggle backed by one remote setting.
///
/// The switch keeps a single local boolean. A successful write flips it
/// right away, and every coordinator tick overwrites it from the snapshot.
pub struct Switch {
    info: EntityInfo,
    backing: Backing,
    source: Source,
    is_on: AtomicBool,
    bus: StateBus,
}

impl Switch {
    pub const VALVE_KEY: &'static str = "shutoff_valve";
    pub const VALVE_NAME: &'static str = "Sonic Valve Switch";

    fn new(info: EntityInfo, backing: Backing, source: Source, bus: StateBus) -> Self {
        let is_on = AtomicBool::new(source.compute());
        Self {
            info,
            backing,
            source,
            is_on,
            bus,
        }
    }

    /// The device's shut-off valve. On means open.
    #[must_use]
    pub fn valve(dev: Arc<DeviceCoordinator>, bus: StateBus) -> Self {
        let backing = Backing::Device(dev.clone());
        let info = EntityInfo {
            unique_id: backing.unique_id(Self::VALVE_KEY),
            name: Self::VALVE_NAME,
            platform: Platform::Switch,
            category: None,
            unit: None,
        };
        Self::new(info, backing, Source::Valve(dev), bus)
    }

    #[must_use]
    pub fn property(prop: Arc<PropertyCoordinator>, setting: PropertySwitch, bus: StateBus) -> Self {
        let backing = Backing::Property(prop.clone());
        let info = EntityInfo {
            unique_id: backing.unique_id(setting.key()),
            name: setting.name(),
            platform: Platform::Switch,
            category: Some(EntityCategory::Config),
            unit: None,
        };
        Self::new(info, backing, Source::Property(prop, setting), bus)
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.is_on.load(Ordering::Acquire)
    }

    pub async fn turn_on(&self) -> ApiResult<()> {
        self.set(true).await
    }

    pub async fn turn_off(&self) -> ApiResult<()> {
        self.set(false).await
    }

    async fn set(&self, on: bool) -> ApiResult<()> {
        match &self.source {
            Source::Valve(dev) if on => dev.api().open_valve(dev.id()).await?,
            Source::Valve(dev) => dev.api().close_valve(dev.id()).await?,
            Source::Property(prop, sw) => sw.write(prop.api().as_ref(), prop.id(), on).await?,
        }

        log::info!(
            "[{}] Switched {}",
            self.info.unique_id,
            if on { "on" } else { "off" }
        );
        self.is_on.store(on, Ordering::Release);
        self.bus.publish(self);
        Ok(())
    }

    /// Overwrite the local state from the latest snapshot.
    pub fn sync(&self) {
        let on = self.source.compute();
        if self.is_on.swap(on, Ordering::AcqRel) != on {
            log::debug!("[{}] Reconciled to {on}", self.info.unique_id);
        }
    }
}

impl Entity for Switch {
    fn info(&self) -> &EntityInfo {
        &self.info
    }

    fn backing(&self) -> &Backing {
        &self.backing
    }

    fn state(&self) -> EntityState {
        EntityState::Switch(self.is_on())
    }

    fn on_coordinator_update(&self) {
        self.sync();
    }
}
