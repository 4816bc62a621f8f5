use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use herolabs::api::{BatteryState, DeviceInfo, RadioConnection, Telemetry, ValveState};
use herolabs::client::SonicApi;
use herolabs::error::HeroLabsResult;

use crate::coordinator::{
    CoordinatorCore, ListenerHandle, Refresh, UPDATE_TIMEOUT, UpdateFailed,
};

/// Everything known about one device after a successful tick.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceSnapshot {
    pub info: DeviceInfo,
    pub telemetry: Telemetry,
}

pub struct DeviceCoordinator {
    api: Arc<dyn SonicApi>,
    id: String,
    core: CoordinatorCore<DeviceSnapshot>,
}

impl DeviceCoordinator {
    #[must_use]
    pub fn new(api: Arc<dyn SonicApi>, id: String) -> Self {
        Self::with_timeout(api, id, UPDATE_TIMEOUT)
    }

    #[must_use]
    pub fn with_timeout(api: Arc<dyn SonicApi>, id: String, timeout: Duration) -> Self {
        let name = format!("{}-{id}", crate::DOMAIN);
        Self {
            api,
            id,
            core: CoordinatorCore::new(name, timeout),
        }
    }

    async fn fetch(api: &dyn SonicApi, id: &str) -> HeroLabsResult<DeviceSnapshot> {
        let (info, telemetry) = tokio::try_join!(api.device_details(id), api.device_telemetry(id))?;

        log::debug!("[{id}] Sonic device data: {info:?}");
        log::debug!("[{id}] Sonic telemetry data: {telemetry:?}");

        Ok(DeviceSnapshot { info, telemetry })
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn SonicApi> {
        &self.api
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<DeviceSnapshot>> {
        self.core.snapshot()
    }

    #[must_use]
    pub fn last_update_success(&self) -> bool {
        self.core.last_update_success()
    }

    /// True if the last tick succeeded and the valve is reachable over radio.
    #[must_use]
    pub fn available(&self) -> bool {
        self.last_update_success() && self.radio_connection() == Some(RadioConnection::Connected)
    }

    pub fn add_listener(&self, callback: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        self.core.listeners().add(callback)
    }

    fn info<R>(&self, func: impl FnOnce(&DeviceInfo) -> Option<R>) -> Option<R> {
        self.snapshot().and_then(|snap| func(&snap.info))
    }

    fn telemetry<R>(&self, func: impl FnOnce(&Telemetry) -> Option<R>) -> Option<R> {
        self.snapshot().and_then(|snap| func(&snap.telemetry))
    }

    #[must_use]
    pub const fn manufacturer(&self) -> &'static str {
        herolabs::MANUFACTURER
    }

    #[must_use]
    pub const fn model(&self) -> &'static str {
        herolabs::DEVICE_MODEL
    }

    /// Device name, or the model name if the device has none.
    #[must_use]
    pub fn device_name(&self) -> String {
        self.info(|info| info.name.clone())
            .unwrap_or_else(|| self.model().to_string())
    }

    #[must_use]
    pub fn serial_number(&self) -> Option<String> {
        self.info(|info| Some(info.serial_no.clone()))
    }

    #[must_use]
    pub fn radio_connection(&self) -> Option<RadioConnection> {
        self.info(|info| Some(info.radio_connection))
    }

    #[must_use]
    pub fn rssi(&self) -> Option<f64> {
        self.info(|info| info.radio_rssi)
    }

    #[must_use]
    pub fn battery_state(&self) -> Option<BatteryState> {
        self.info(|info| info.battery)
    }

    #[must_use]
    pub fn auto_shut_off_enabled(&self) -> Option<bool> {
        self.info(|info| info.auto_shut_off_enabled)
    }

    /// Seconds of continuous flow before an offline shut-off. Zero disables it.
    #[must_use]
    pub fn auto_shut_off_time_limit(&self) -> Option<u32> {
        self.info(|info| info.auto_shut_off_time_limit)
    }

    /// Millilitres used before an offline shut-off. Zero disables it.
    #[must_use]
    pub fn auto_shut_off_volume_limit(&self) -> Option<u32> {
        self.info(|info| info.auto_shut_off_volume_limit)
    }

    #[must_use]
    pub fn signal_id(&self) -> Option<String> {
        self.info(|info| info.signal_id.clone())
    }

    #[must_use]
    pub fn status(&self) -> Option<String> {
        self.info(|info| info.status.clone())
    }

    #[must_use]
    pub fn valve_state(&self) -> Option<ValveState> {
        self.info(|info| info.valve_state)
    }

    /// Unix timestamp (seconds) of the last measurement.
    #[must_use]
    pub fn last_heard_from_time(&self) -> Option<i64> {
        self.telemetry(|t| t.probed_at)
    }

    /// Millilitres per minute.
    #[must_use]
    pub fn current_flow_rate(&self) -> Option<f64> {
        self.telemetry(|t| t.water_flow)
    }

    #[must_use]
    pub fn current_mbar(&self) -> Option<f64> {
        self.telemetry(|t| t.pressure)
    }

    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        self.telemetry(|t| t.water_temp)
    }
}

#[async_trait]
impl Refresh for DeviceCoordinator {
    fn name(&self) -> &str {
        self.core.name()
    }

    async fn refresh(&self) -> Result<(), UpdateFailed> {
        self.core
            .run_tick(Self::fetch(self.api.as_ref(), &self.id))
            .await
    }

    async fn request_refresh(&self) {
        self.core
            .request_tick(Self::fetch(self.api.as_ref(), &self.id))
            .await;
    }
}
