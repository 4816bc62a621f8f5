use std::collections::BTreeMap;
use std::sync::Arc;

use crate::coordinator::ListenerHandle;
use crate::entity::binary_sensor::AutoShutOffEnabled;
use crate::entity::sensor::Sensor;
use crate::entity::switch::Switch;
use crate::entity::{Entity, EntityView, StateBus};
use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub enum EntityRef {
    Sensor(Arc<Sensor>),
    BinarySensor(Arc<AutoShutOffEnabled>),
    Switch(Arc<Switch>),
}

impl EntityRef {
    #[must_use]
    pub fn as_entity(&self) -> &dyn Entity {
        match self {
            Self::Sensor(ent) => ent.as_ref(),
            Self::BinarySensor(ent) => ent.as_ref(),
            Self::Switch(ent) => ent.as_ref(),
        }
    }
}

impl From<Sensor> for EntityRef {
    fn from(value: Sensor) -> Self {
        Self::Sensor(Arc::new(value))
    }
}

impl From<AutoShutOffEnabled> for EntityRef {
    fn from(value: AutoShutOffEnabled) -> Self {
        Self::BinarySensor(Arc::new(value))
    }
}

impl From<Switch> for EntityRef {
    fn from(value: Switch) -> Self {
        Self::Switch(Arc::new(value))
    }
}

/// All entities of one integration, keyed by unique id.
///
/// Each entity is subscribed to its coordinator while it is registered.
/// Dropping the registry removes every subscription.
pub struct EntityRegistry {
    bus: StateBus,
    entities: BTreeMap<String, EntityRef>,
    handles: Vec<ListenerHandle>,
}

impl EntityRegistry {
    #[must_use]
    pub const fn new(bus: StateBus) -> Self {
        Self {
            bus,
            entities: BTreeMap::new(),
            handles: Vec::new(),
        }
    }

    #[must_use]
    pub const fn bus(&self) -> &StateBus {
        &self.bus
    }

    /// Register an entity. An entity with a unique id that is already taken
    /// is ignored.
    pub fn add(&mut self, entity: impl Into<EntityRef>) {
        let entity = entity.into();
        let uid = entity.as_entity().info().unique_id.clone();
        if self.entities.contains_key(&uid) {
            log::warn!("Entity {uid} already registered, ignoring duplicate");
            return;
        }

        let bus = self.bus.clone();
        let listener = entity.clone();
        let handle = entity.as_entity().backing().add_listener(move || {
            let ent = listener.as_entity();
            ent.on_coordinator_update();
            bus.publish(ent);
        });

        log::debug!("Registered {:?} entity {uid}", entity.as_entity().info().platform);
        self.handles.push(handle);
        self.entities.insert(uid, entity);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn get(&self, uid: &str) -> Option<&EntityRef> {
        self.entities.get(uid)
    }

    pub fn view(&self, uid: &str) -> ApiResult<EntityView> {
        self.get(uid)
            .map(|ent| ent.as_entity().view())
            .ok_or_else(|| ApiError::EntityNotFound(uid.to_string()))
    }

    #[must_use]
    pub fn views(&self) -> Vec<EntityView> {
        self.entities
            .values()
            .map(|ent| ent.as_entity().view())
            .collect()
    }

    pub fn switch(&self, uid: &str) -> ApiResult<Arc<Switch>> {
        match self.get(uid) {
            Some(EntityRef::Switch(switch)) => Ok(switch.clone()),
            Some(_) => Err(ApiError::NotASwitch(uid.to_string())),
            None => Err(ApiError::EntityNotFound(uid.to_string())),
        }
    }

    /// Unsubscribe and drop every entity.
    pub fn clear(&mut self) {
        self.handles.clear();
        self.entities.clear();
    }
}
