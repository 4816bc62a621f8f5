//! Scripted in-memory [`SonicApi`] for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use herolabs::api::{
    BatteryState, DeviceInfo, DeviceSummary, NotificationSettings, NotificationSettingsUpdate,
    PropertyDetails, PropertySettings, PropertySettingsUpdate, PropertySummary, RadioConnection,
    Telemetry, ValveState,
};
use herolabs::client::SonicApi;
use herolabs::error::{HeroLabsError, HeroLabsResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Op {
    ListDevices,
    ListProperties,
    DeviceDetails,
    DeviceTelemetry,
    OpenValve,
    CloseValve,
    PropertyDetails,
    PropertySettings,
    NotificationSettings,
    UpdatePropertySettings,
    UpdateNotificationSettings,
}

#[derive(Default)]
struct MockState {
    devices: BTreeMap<String, (DeviceInfo, Telemetry)>,
    properties: BTreeMap<String, (PropertyDetails, PropertySettings, NotificationSettings)>,
    failing: BTreeSet<Op>,
    delay: Option<Duration>,
    calls: Vec<(Op, String)>,
    settings_updates: Vec<(String, PropertySettingsUpdate)>,
    notification_updates: Vec<(String, NotificationSettingsUpdate)>,
}

#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

fn not_found(id: &str) -> HeroLabsError {
    HeroLabsError::ServiceUnavailable(format!("{id} (not found in mock)"))
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&self, id: &str, serial: &str) {
        let info = DeviceInfo {
            id: id.to_string(),
            name: Some(format!("Sonic {serial}")),
            serial_no: serial.to_string(),
            radio_connection: RadioConnection::Connected,
            radio_rssi: Some(-60.0),
            battery: Some(BatteryState::ExternalPowerSupply),
            auto_shut_off_enabled: Some(true),
            auto_shut_off_time_limit: Some(3600),
            auto_shut_off_volume_limit: Some(5000),
            signal_id: Some("signal-1".to_string()),
            status: Some(String::new()),
            valve_state: Some(ValveState::Open),
        };
        let telemetry = Telemetry {
            probed_at: Some(1_700_000_000),
            water_flow: Some(1500.0),
            pressure: Some(1013.0),
            water_temp: Some(14.26),
        };
        self.state
            .lock()
            .devices
            .insert(id.to_string(), (info, telemetry));
    }

    pub fn add_property(&self, id: &str, name: &str) {
        let details = PropertyDetails {
            id: id.to_string(),
            name: name.to_string(),
            active: true,
        };
        let settings = PropertySettings {
            auto_shut_off: Some(true),
            pressure_tests_enabled: Some(false),
            pressure_tests_schedule: Some("03:00:00".to_string()),
            timezone: Some("Europe/London".to_string()),
        };
        let notifications = NotificationSettings {
            cloud_disconnection: Some(true),
            device_handle_moved: Some(true),
            health_check_failed: Some(false),
            low_battery_level: Some(true),
            pressure_test_failed: Some(true),
            pressure_test_skipped: Some(false),
            radio_disconnection: Some(true),
            legionella_risk: Some(true),
            low_water_temperature: Some(false),
            high_volume_threshold_litres: Some(200),
            long_flow_notification_delay_mins: Some(30),
        };
        self.state
            .lock()
            .properties
            .insert(id.to_string(), (details, settings, notifications));
    }

    pub fn update_device(&self, id: &str, func: impl FnOnce(&mut DeviceInfo)) {
        if let Some((info, _)) = self.state.lock().devices.get_mut(id) {
            func(info);
        }
    }

    pub fn update_telemetry(&self, id: &str, func: impl FnOnce(&mut Telemetry)) {
        if let Some((_, telemetry)) = self.state.lock().devices.get_mut(id) {
            func(telemetry);
        }
    }

    pub fn update_property(
        &self,
        id: &str,
        func: impl FnOnce(&mut PropertyDetails, &mut PropertySettings, &mut NotificationSettings),
    ) {
        if let Some((details, settings, notifications)) = self.state.lock().properties.get_mut(id)
        {
            func(details, settings, notifications);
        }
    }

    pub fn fail(&self, op: Op) {
        self.state.lock().failing.insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.state.lock().failing.remove(&op);
    }

    /// Delay every read call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }

    pub fn calls(&self) -> Vec<(Op, String)> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(x, _)| *x == op)
            .count()
    }

    pub fn settings_updates(&self) -> Vec<(String, PropertySettingsUpdate)> {
        self.state.lock().settings_updates.clone()
    }

    pub fn notification_updates(&self) -> Vec<(String, NotificationSettingsUpdate)> {
        self.state.lock().notification_updates.clone()
    }

    /// Record the call, and fail it if requested.
    fn enter(&self, op: Op, id: &str) -> HeroLabsResult<()> {
        let mut lock = self.state.lock();
        lock.calls.push((op, id.to_string()));
        if lock.failing.contains(&op) {
            return Err(HeroLabsError::ServiceUnavailable(format!("{op:?}")));
        }
        Ok(())
    }

    async fn read<T>(
        &self,
        op: Op,
        id: &str,
        func: impl FnOnce(&MockState) -> Option<T> + Send,
    ) -> HeroLabsResult<T> {
        self.enter(op, id)?;
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        func(&self.state.lock()).ok_or_else(|| not_found(id))
    }
}

#[async_trait]
impl SonicApi for MockApi {
    async fn list_devices(&self) -> HeroLabsResult<Vec<DeviceSummary>> {
        self.read(Op::ListDevices, "", |state| {
            Some(
                state
                    .devices
                    .values()
                    .map(|(info, _)| DeviceSummary {
                        id: info.id.clone(),
                        name: info.name.clone(),
                    })
                    .collect(),
            )
        })
        .await
    }

    async fn list_properties(&self) -> HeroLabsResult<Vec<PropertySummary>> {
        self.read(Op::ListProperties, "", |state| {
            Some(
                state
                    .properties
                    .values()
                    .map(|(details, _, _)| PropertySummary {
                        id: details.id.clone(),
                        name: Some(details.name.clone()),
                    })
                    .collect(),
            )
        })
        .await
    }

    async fn device_details(&self, id: &str) -> HeroLabsResult<DeviceInfo> {
        self.read(Op::DeviceDetails, id, |state| {
            state.devices.get(id).map(|(info, _)| info.clone())
        })
        .await
    }

    async fn device_telemetry(&self, id: &str) -> HeroLabsResult<Telemetry> {
        self.read(Op::DeviceTelemetry, id, |state| {
            state.devices.get(id).map(|(_, telemetry)| telemetry.clone())
        })
        .await
    }

    async fn open_valve(&self, id: &str) -> HeroLabsResult<()> {
        self.enter(Op::OpenValve, id)
    }

    async fn close_valve(&self, id: &str) -> HeroLabsResult<()> {
        self.enter(Op::CloseValve, id)
    }

    async fn property_details(&self, id: &str) -> HeroLabsResult<PropertyDetails> {
        self.read(Op::PropertyDetails, id, |state| {
            state.properties.get(id).map(|(details, _, _)| details.clone())
        })
        .await
    }

    async fn property_settings(&self, id: &str) -> HeroLabsResult<PropertySettings> {
        self.read(Op::PropertySettings, id, |state| {
            state.properties.get(id).map(|(_, settings, _)| settings.clone())
        })
        .await
    }

    async fn notification_settings(&self, id: &str) -> HeroLabsResult<NotificationSettings> {
        self.read(Op::NotificationSettings, id, |state| {
            state.properties.get(id).map(|(_, _, notif)| notif.clone())
        })
        .await
    }

    async fn update_property_settings(
        &self,
        id: &str,
        update: &PropertySettingsUpdate,
    ) -> HeroLabsResult<()> {
        self.enter(Op::UpdatePropertySettings, id)?;
        self.state
            .lock()
            .settings_updates
            .push((id.to_string(), update.clone()));
        Ok(())
    }

    async fn update_notification_settings(
        &self,
        id: &str,
        update: &NotificationSettingsUpdate,
    ) -> HeroLabsResult<()> {
        self.enter(Op::UpdateNotificationSettings, id)?;
        self.state
            .lock()
            .notification_updates
            .push((id.to_string(), update.clone()));
        Ok(())
    }
}
