//! Polling coordinators.
//!
//! A coordinator owns the cached state for one Sonic device or property. Each
//! tick fetches every sub-resource, and only if all of them succeed replaces
//! the cached snapshot in one step. A failed tick keeps the previous snapshot
//! and marks the coordinator as failed until the next successful tick.
//! Registered listeners are notified after every tick, successful or not.

pub mod device;
pub mod property;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use herolabs::error::{HeroLabsError, HeroLabsResult};

pub use device::{DeviceCoordinator, DeviceSnapshot};
pub use property::{PropertyCoordinator, PropertySnapshot};

pub const UPDATE_INTERVAL: Duration = Duration::from_secs(60);
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum UpdateFailed {
    #[error("Update timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Request(#[from] HeroLabsError),
}

/// Implemented by both coordinator types, so the scheduler can drive them.
#[async_trait]
pub trait Refresh: Send + Sync {
    fn name(&self) -> &str;

    /// Run one tick, waiting for any tick already in flight to finish first.
    async fn refresh(&self) -> Result<(), UpdateFailed>;

    /// Run one tick, unless one is already in flight.
    async fn request_refresh(&self);
}

type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct ListenerMap {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback>,
}

/// Subscriber list for coordinator updates.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<Mutex<ListenerMap>>,
}

/// Registration token returned by [`Listeners::add`]. The listener is removed
/// when the handle is dropped.
#[must_use = "dropping the handle removes the listener"]
pub struct ListenerHandle {
    id: u64,
    map: Weak<Mutex<ListenerMap>>,
}

impl Listeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, callback: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        let mut lock = self.inner.lock();
        let id = lock.next_id;
        lock.next_id += 1;
        lock.callbacks.insert(id, Arc::new(callback));

        ListenerHandle {
            id,
            map: Arc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self) {
        // callbacks may register or remove listeners, so never call them
        // with the lock held
        let callbacks: Vec<Callback> = self.inner.lock().callbacks.values().cloned().collect();
        for callback in callbacks {
            callback();
        }
    }
}

impl ListenerHandle {
    pub fn remove(self) {
        drop(self);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(map) = self.map.upgrade() {
            map.lock().callbacks.remove(&self.id);
        }
    }
}

/// State and tick bookkeeping shared by both coordinator types.
pub(crate) struct CoordinatorCore<T> {
    name: String,
    timeout: Duration,
    snapshot: RwLock<Option<Arc<T>>>,
    last_update_success: AtomicBool,
    listeners: Listeners,
    tick: tokio::sync::Mutex<()>,
}

impl<T> CoordinatorCore<T> {
    pub fn new(name: String, timeout: Duration) -> Self {
        Self {
            name,
            timeout,
            snapshot: RwLock::new(None),
            last_update_success: AtomicBool::new(false),
            listeners: Listeners::new(),
            tick: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.snapshot.read().clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::Acquire)
    }

    pub const fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Run one tick with `fetch`, serialized against other ticks.
    pub async fn run_tick<F>(&self, fetch: F) -> Result<(), UpdateFailed>
    where
        F: Future<Output = HeroLabsResult<T>> + Send,
    {
        let _guard = self.tick.lock().await;
        self.tick_locked(fetch).await
    }

    /// Like [`Self::run_tick`], but skips the tick if one is already running.
    pub async fn request_tick<F>(&self, fetch: F)
    where
        F: Future<Output = HeroLabsResult<T>> + Send,
    {
        let Ok(_guard) = self.tick.try_lock() else {
            log::debug!("[{}] Refresh already in progress, skipping", self.name);
            return;
        };
        // failures are logged and recorded by the tick itself
        let _ = self.tick_locked(fetch).await;
    }

    async fn tick_locked<F>(&self, fetch: F) -> Result<(), UpdateFailed>
    where
        F: Future<Output = HeroLabsResult<T>> + Send,
    {
        let result = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(err)) => Err(UpdateFailed::Request(err)),
            Err(_) => Err(UpdateFailed::Timeout(self.timeout)),
        };

        let result = match result {
            Ok(snapshot) => {
                let previous = self.snapshot.write().replace(Arc::new(snapshot));
                let was_ok = self.last_update_success.swap(true, Ordering::AcqRel);
                if previous.is_some() && !was_ok {
                    log::info!("[{}] Fetching data recovered", self.name);
                }
                Ok(())
            }
            Err(err) => {
                let was_ok = self.last_update_success.swap(false, Ordering::AcqRel);
                match &err {
                    UpdateFailed::Request(inner) if inner.is_auth_error() => {
                        log::error!("[{}] Error fetching data: {err}", self.name);
                    }
                    _ if was_ok => log::warn!("[{}] Error fetching data: {err}", self.name),
                    _ => log::debug!("[{}] Error fetching data: {err}", self.name),
                }
                Err(err)
            }
        };

        self.listeners.notify();
        result
    }
}
