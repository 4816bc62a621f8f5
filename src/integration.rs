//! Integration lifecycle: account validation, setup and unload.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use thiserror::Error;

use herolabs::client::{HeroLabsClient, SonicApi};
use herolabs::error::HeroLabsError;

use crate::config::{AccountConfig, AppConfig};
use crate::coordinator::{DeviceCoordinator, PropertyCoordinator, Refresh, UPDATE_TIMEOUT};
use crate::entity::binary_sensor::AutoShutOffEnabled;
use crate::entity::registry::EntityRegistry;
use crate::entity::sensor::{DeviceSensor, PropertySensor, Sensor};
use crate::entity::switch::{PropertySwitch, Switch};
use crate::entity::StateBus;
use crate::error::{ApiError, ApiResult};
use crate::scheduler::PollScheduler;

#[derive(Clone)]
pub struct SetupOptions {
    pub timeout: Duration,
    pub timezone: Option<Arc<tzfile::Tz>>,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            timeout: UPDATE_TIMEOUT,
            timezone: None,
        }
    }
}

impl SetupOptions {
    /// An unknown timezone is logged, and telemetry timestamps fall back to UTC.
    #[must_use]
    pub fn from_config(conf: &AppConfig) -> Self {
        let timezone = match tzfile::Tz::named(&conf.bridge.timezone) {
            Ok(tz) => Some(Arc::new(tz)),
            Err(err) => {
                log::warn!(
                    "Cannot load timezone {:?}, using UTC: {err}",
                    conf.bridge.timezone
                );
                None
            }
        };

        Self {
            timeout: conf.polling.timeout(),
            timezone,
        }
    }
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Cannot connect to the Sonic API: {0}")]
    CannotConnect(#[source] HeroLabsError),

    #[error("Unexpected error: {0}")]
    Unknown(#[source] ApiError),
}

impl ValidationError {
    /// Short error code, as shown to the user.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CannotConnect(_) => "cannot_connect",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Log in to the account. Rejected credentials and unreachable or failing
/// service endpoints are reported as not ready, so the caller retries later.
pub async fn login(account: &AccountConfig) -> ApiResult<HeroLabsClient> {
    let password = account.resolve_password()?;
    match HeroLabsClient::login(&account.url, &account.username, &password).await {
        Ok(client) => Ok(client),
        Err(err) if err.is_auth_error() || err.is_request_error() => {
            Err(ApiError::NotReady(err.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Check that the account credentials work, returning a title for the
/// account (the name of its first device).
pub async fn validate_input(account: &AccountConfig) -> Result<String, ValidationError> {
    let password = account
        .resolve_password()
        .map_err(ValidationError::Unknown)?;

    let client = match HeroLabsClient::login(&account.url, &account.username, &password).await {
        Ok(client) => client,
        Err(err @ HeroLabsError::InvalidCredentials) => {
            log::error!("Error connecting to the Sonic API: {err}");
            return Err(ValidationError::CannotConnect(err));
        }
        Err(err) => return Err(ValidationError::Unknown(err.into())),
    };

    account_title(&client).await.map_err(|err| {
        log::error!("Unexpected exception: {err}");
        ValidationError::Unknown(err)
    })
}

async fn account_title(api: &dyn SonicApi) -> ApiResult<String> {
    let devices = api.list_devices().await?;
    let first = devices.first().ok_or(ApiError::NoDevices)?;
    let info = api.device_details(&first.id).await?;
    Ok(info
        .name
        .unwrap_or_else(|| herolabs::DEVICE_MODEL.to_string()))
}

/// A running integration: coordinators for every device and property on the
/// account, and the entities built on top of them.
pub struct Integration {
    devices: Vec<Arc<DeviceCoordinator>>,
    properties: Vec<Arc<PropertyCoordinator>>,
    entities: RwLock<EntityRegistry>,
    scheduler: Mutex<Option<PollScheduler>>,
    bus: StateBus,
}

/// Log in and set up the integration from the application config.
pub async fn setup(conf: &AppConfig) -> ApiResult<Integration> {
    let client = login(&conf.account).await?;
    Integration::from_client(Arc::new(client), SetupOptions::from_config(conf)).await
}

impl Integration {
    /// Discover devices and properties, run the first refresh of every
    /// coordinator concurrently, then build the entities.
    ///
    /// A failing first refresh reports [`ApiError::NotReady`].
    pub async fn from_client(api: Arc<dyn SonicApi>, options: SetupOptions) -> ApiResult<Self> {
        let (device_list, property_list) =
            tokio::try_join!(api.list_devices(), api.list_properties())
                .map_err(|err| ApiError::NotReady(err.to_string()))?;

        log::debug!("Sonic device list: {device_list:?}");
        log::debug!("Sonic property list: {property_list:?}");

        let devices: Vec<_> = device_list
            .into_iter()
            .map(|dev| {
                Arc::new(DeviceCoordinator::with_timeout(
                    api.clone(),
                    dev.id,
                    options.timeout,
                ))
            })
            .collect();

        let properties: Vec<_> = property_list
            .into_iter()
            .map(|prop| {
                Arc::new(PropertyCoordinator::with_timeout(
                    api.clone(),
                    prop.id,
                    options.timeout,
                ))
            })
            .collect();

        let coordinators = devices
            .iter()
            .map(|dev| dev.clone() as Arc<dyn Refresh>)
            .chain(properties.iter().map(|prop| prop.clone() as Arc<dyn Refresh>));

        let results = join_all(coordinators.map(|coord| async move {
            coord
                .refresh()
                .await
                .map_err(|err| ApiError::NotReady(format!("{}: {err}", coord.name())))
        }))
        .await;
        results.into_iter().collect::<ApiResult<Vec<()>>>()?;

        let bus = StateBus::new();
        let mut reg = EntityRegistry::new(bus.clone());

        for dev in &devices {
            for sensor in DeviceSensor::ALL {
                reg.add(Sensor::device(dev.clone(), sensor, options.timezone.clone()));
            }
            reg.add(AutoShutOffEnabled::new(dev.clone()));
            reg.add(Switch::valve(dev.clone(), bus.clone()));
        }

        for prop in &properties {
            for sensor in PropertySensor::ALL {
                reg.add(Sensor::property(prop.clone(), sensor));
            }
            for setting in PropertySwitch::ALL {
                reg.add(Switch::property(prop.clone(), setting, bus.clone()));
            }
        }

        log::info!(
            "Set up {} devices, {} properties, {} entities",
            devices.len(),
            properties.len(),
            reg.len()
        );

        Ok(Self {
            devices,
            properties,
            entities: RwLock::new(reg),
            scheduler: Mutex::new(None),
            bus,
        })
    }

    #[must_use]
    pub fn devices(&self) -> &[Arc<DeviceCoordinator>] {
        &self.devices
    }

    #[must_use]
    pub fn properties(&self) -> &[Arc<PropertyCoordinator>] {
        &self.properties
    }

    #[must_use]
    pub fn coordinators(&self) -> Vec<Arc<dyn Refresh>> {
        let devices = self.devices.iter().map(|dev| dev.clone() as Arc<dyn Refresh>);
        let properties = self
            .properties
            .iter()
            .map(|prop| prop.clone() as Arc<dyn Refresh>);
        devices.chain(properties).collect()
    }

    pub fn entities(&self) -> RwLockReadGuard<'_, EntityRegistry> {
        self.entities.read()
    }

    #[must_use]
    pub const fn bus(&self) -> &StateBus {
        &self.bus
    }

    /// Start the periodic refresh of every coordinator. Does nothing if
    /// polling is already running.
    pub fn start_polling(&self, period: Duration) {
        let mut lock = self.scheduler.lock();
        if lock.is_none() {
            *lock = Some(PollScheduler::start(self.coordinators(), period));
        }
    }

    /// Request a refresh of every coordinator. Coordinators with a tick in
    /// flight are skipped.
    pub async fn refresh_all(&self) {
        let coordinators = self.coordinators();
        join_all(coordinators.iter().map(|coord| coord.request_refresh())).await;
    }

    /// Stop polling and drop every entity.
    pub async fn unload(&self) {
        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            scheduler.stop().await;
        }
        self.entities.write().clear();
        log::info!("Integration unloaded");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use herolabs::api::ValveState;

    use url::Url;

    use crate::config::{AccountConfig, parse_str};
    use crate::entity::{EntityState, SensorValue};
    use crate::error::ApiError;
    use crate::integration::{Integration, SetupOptions, ValidationError, account_title, login};
    use crate::mock::{MockApi, Op};

    fn api() -> Arc<MockApi> {
        let api = Arc::new(MockApi::new());
        api.add_device("dev1", "SN-0001");
        api.add_device("dev2", "SN-0002");
        api.add_property("prop1", "Home");
        api
    }

    #[tokio::test]
    async fn setup_builds_all_entities() {
        let api = api();
        let integ = Integration::from_client(api.clone(), SetupOptions::default())
            .await
            .unwrap();

        assert_eq!(integ.devices().len(), 2);
        assert_eq!(integ.properties().len(), 1);
        // 11 per device, 13 per property
        assert_eq!(integ.entities().len(), 2 * 11 + 13);

        assert_eq!(api.count(Op::DeviceDetails), 2);
        assert_eq!(api.count(Op::PropertySettings), 1);

        let view = integ.entities().view("SN-0002_water_pressure").unwrap();
        assert_eq!(view.state, EntityState::Sensor(SensorValue::Float(1.0)));
        assert!(integ.entities().switch("prop1_auto_shutoff_switch").is_ok());
    }

    #[tokio::test]
    async fn failing_first_refresh_is_not_ready() {
        let api = api();
        api.fail(Op::NotificationSettings);

        let err = Integration::from_client(api, SetupOptions::default())
            .await
            .err()
            .unwrap();
        assert!(err.is_not_ready());
    }

    #[tokio::test]
    async fn failing_discovery_is_not_ready() {
        let api = api();
        api.fail(Op::ListProperties);

        let err = Integration::from_client(api, SetupOptions::default())
            .await
            .err()
            .unwrap();
        assert!(err.is_not_ready());
    }

    #[tokio::test]
    async fn refresh_all_updates_entities() {
        let api = api();
        let integ = Integration::from_client(api.clone(), SetupOptions::default())
            .await
            .unwrap();
        let switch = integ.entities().switch("SN-0001_shutoff_valve").unwrap();
        assert!(switch.is_on());

        api.update_device("dev1", |info| info.valve_state = Some(ValveState::Closed));
        integ.refresh_all().await;

        assert!(!switch.is_on());
        assert_eq!(api.count(Op::DeviceDetails), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn unload_stops_polling() {
        let api = api();
        let integ = Integration::from_client(api.clone(), SetupOptions::default())
            .await
            .unwrap();
        integ.start_polling(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(api.count(Op::DeviceDetails), 4);

        integ.unload().await;
        assert!(integ.entities().is_empty());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.count(Op::DeviceDetails), 4);
    }

    #[tokio::test]
    async fn title_is_first_device_name() {
        let api = api();
        assert_eq!(account_title(api.as_ref()).await.unwrap(), "Sonic SN-0001");

        api.update_device("dev1", |info| info.name = None);
        assert_eq!(account_title(api.as_ref()).await.unwrap(), "Sonic");
    }

    #[tokio::test]
    async fn title_needs_a_device() {
        let api = Arc::new(MockApi::new());
        let err = account_title(api.as_ref()).await.unwrap_err();
        assert!(matches!(err, ApiError::NoDevices));
    }

    #[tokio::test]
    async fn unreachable_service_is_not_ready() {
        let account = AccountConfig {
            url: Url::parse("http://127.0.0.1:1/api/v1/").unwrap(),
            username: "user@example.com".to_string(),
            password: Some("secret".to_string()),
            password_env: None,
        };

        let err = login(&account).await.err().unwrap();
        assert!(err.is_not_ready(), "{err}");
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let conf = parse_str("account:\n  username: u\nbridge:\n  timezone: Not/AZone\n").unwrap();
        let options = SetupOptions::from_config(&conf);
        assert!(options.timezone.is_none());
        assert_eq!(options.timeout, conf.polling.timeout());
    }

    #[test]
    fn validation_codes() {
        let err = ValidationError::CannotConnect(herolabs::error::HeroLabsError::InvalidCredentials);
        assert_eq!(err.code(), "cannot_connect");
        assert_eq!(ValidationError::Unknown(ApiError::NoDevices).code(), "unknown");
    }
}
