use std::sync::Arc;

use crate::coordinator::DeviceCoordinator;
use crate::entity::{Backing, Entity, EntityInfo, EntityState, Platform};

/// Reports whether the device's offline auto shut-off is enabled.
pub struct AutoShutOffEnabled {
    info: EntityInfo,
    backing: Backing,
}

impl AutoShutOffEnabled {
    pub const KEY: &'static str = "auto_shut_off_enabled";
    pub const NAME: &'static str = "Auto Shut Off Enabled Status";

    #[must_use]
    pub fn new(dev: Arc<DeviceCoordinator>) -> Self {
        let backing = Backing::Device(dev);
        let info = EntityInfo {
            unique_id: backing.unique_id(Self::KEY),
            name: Self::NAME,
            platform: Platform::BinarySensor,
            category: None,
            unit: None,
        };
        Self { info, backing }
    }

    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        match &self.backing {
            Backing::Device(dev) => dev.auto_shut_off_enabled(),
            Backing::Property(_) => None,
        }
    }
}

impl Entity for AutoShutOffEnabled {
    fn info(&self) -> &EntityInfo {
        &self.info
    }

    fn backing(&self) -> &Backing {
        &self.backing
    }

    fn state(&self) -> EntityState {
        EntityState::BinarySensor(self.is_on())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::coordinator::{DeviceCoordinator, Refresh};
    use crate::entity::binary_sensor::AutoShutOffEnabled;
    use crate::entity::{Entity, EntityState};
    use crate::mock::MockApi;

    #[tokio::test]
    async fn follows_device_flag() {
        let api = Arc::new(MockApi::new());
        api.add_device("dev1", "SN-0001");
        let dev = Arc::new(DeviceCoordinator::new(api.clone(), "dev1".to_string()));
        dev.refresh().await.unwrap();

        let sensor = AutoShutOffEnabled::new(dev.clone());
        assert_eq!(sensor.info().unique_id, "SN-0001_auto_shut_off_enabled");
        assert_eq!(sensor.state(), EntityState::BinarySensor(Some(true)));

        api.update_device("dev1", |info| info.auto_shut_off_enabled = Some(false));
        dev.refresh().await.unwrap();
        assert_eq!(sensor.state(), EntityState::BinarySensor(Some(false)));

        api.update_device("dev1", |info| info.auto_shut_off_enabled = None);
        dev.refresh().await.unwrap();
        assert_eq!(sensor.state(), EntityState::BinarySensor(None));
    }
}
