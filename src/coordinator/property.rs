use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use herolabs::api::{NotificationSettings, PropertyDetails, PropertySettings};
use herolabs::client::SonicApi;
use herolabs::error::HeroLabsResult;

use crate::coordinator::{
    CoordinatorCore, ListenerHandle, Refresh, UPDATE_TIMEOUT, UpdateFailed,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertySnapshot {
    pub details: PropertyDetails,
    pub settings: PropertySettings,
    pub notifications: NotificationSettings,
}

pub struct PropertyCoordinator {
    api: Arc<dyn SonicApi>,
    id: String,
    core: CoordinatorCore<PropertySnapshot>,
}

impl PropertyCoordinator {
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

    async fn fetch(api: &dyn SonicApi, id: &str) -> HeroLabsResult<PropertySnapshot> {
        let (details, settings, notifications) = tokio::try_join!(
            api.property_details(id),
            api.property_settings(id),
            api.notification_settings(id),
        )?;

        log::debug!("[{id}] Sonic property data: {details:?}");
        log::debug!("[{id}] Sonic property settings: {settings:?}");
        log::debug!("[{id}] Sonic property notification settings: {notifications:?}");

        Ok(PropertySnapshot {
            details,
            settings,
            notifications,
        })
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
    pub fn snapshot(&self) -> Option<Arc<PropertySnapshot>> {
        self.core.snapshot()
    }

    #[must_use]
    pub fn last_update_success(&self) -> bool {
        self.core.last_update_success()
    }

    pub fn add_listener(&self, callback: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        self.core.listeners().add(callback)
    }

    fn get<R>(&self, func: impl FnOnce(&PropertySnapshot) -> Option<R>) -> Option<R> {
        self.snapshot().and_then(|snap| func(&snap))
    }

    #[must_use]
    pub fn property_name(&self) -> Option<String> {
        self.get(|snap| Some(snap.details.name.clone()))
    }

    #[must_use]
    pub fn active(&self) -> Option<bool> {
        self.get(|snap| Some(snap.details.active))
    }

    #[must_use]
    pub fn auto_shut_off(&self) -> Option<bool> {
        self.get(|snap| snap.settings.auto_shut_off)
    }

    #[must_use]
    pub fn pressure_tests_enabled(&self) -> Option<bool> {
        self.get(|snap| snap.settings.pressure_tests_enabled)
    }

    /// Daily pressure test time, `HH:MM:SS`.
    #[must_use]
    pub fn pressure_tests_schedule(&self) -> Option<String> {
        self.get(|snap| snap.settings.pressure_tests_schedule.clone())
    }

    #[must_use]
    pub fn timezone(&self) -> Option<String> {
        self.get(|snap| snap.settings.timezone.clone())
    }

    #[must_use]
    pub fn high_volume_threshold_litres(&self) -> Option<u32> {
        self.get(|snap| snap.notifications.high_volume_threshold_litres)
    }

    #[must_use]
    pub fn long_flow_notification_delay_mins(&self) -> Option<u32> {
        self.get(|snap| snap.notifications.long_flow_notification_delay_mins)
    }
}

#[async_trait]
impl Refresh for PropertyCoordinator {
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
