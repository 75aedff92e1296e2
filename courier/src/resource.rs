use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use courier_backend::{CacheError, CodingCache, KeyedCache};
use courier_core::{CacheKey, Endpoint, Interface, InterfaceError, TaskResult, TaskState, shared};
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::client::Client;
use crate::coordinator::{EndpointCoordinator, TaskHandle};
use crate::dependency::Dependency;
use crate::error::ResourceError;
use crate::policy::{CachePolicy, ResourceConfig};

type ClientOf<E> = Client<<E as Endpoint>::Root>;
type IdOf<E> = <<E as Endpoint>::Root as Interface>::Id;
type ErrorOf<E> = <<E as Endpoint>::Root as Interface>::Error;

struct Persistence<V> {
    save: for<'a> fn(&'a CodingCache, &'a CacheKey, V) -> BoxFuture<'a, Result<(), CacheError>>,
    load: for<'a> fn(&'a CodingCache, &'a CacheKey) -> BoxFuture<'a, Result<Option<V>, CacheError>>,
}

fn save_value<'a, V>(
    cache: &'a CodingCache,
    key: &'a CacheKey,
    value: V,
) -> BoxFuture<'a, Result<(), CacheError>>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    KeyedCache::<CacheKey, V>::put(cache, value, key)
}

fn load_value<'a, V>(
    cache: &'a CodingCache,
    key: &'a CacheKey,
) -> BoxFuture<'a, Result<Option<V>, CacheError>>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    KeyedCache::<CacheKey, V>::get(cache, key)
}

struct Inner<E: Endpoint, V> {
    coordinator: EndpointCoordinator<E, V>,
    config: ResourceConfig,
    persistence: Option<Persistence<V>>,
    client: Mutex<Option<Weak<ClientOf<E>>>>,
    root_id: Mutex<Option<IdOf<E>>>,
    value: watch::Sender<Option<V>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    writes: Arc<Writes>,
}

/// Orders the cache writes of one resource.
///
/// Every write takes a sequence number when it is queued and holds `written`
/// across the save; a write older than the last completed one is skipped.
#[derive(Debug, Default)]
struct Writes {
    queued: AtomicU64,
    written: tokio::sync::Mutex<u64>,
}

impl<E: Endpoint, V> Drop for Inner<E, V> {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.abort();
        }
    }
}

/// A reactive handle over one coordinator.
///
/// A resource is attached to a client, fetches when first read, follows the
/// client's change notifications and keeps the latest successful value.
/// Errors never clear the value; only [`reset`](Self::reset) does.
///
/// With a persistent key and a policy that returns cache data, the value is
/// hydrated from the client's resource cache on attach and written back
/// after every update, in update order. Cache failures are logged and
/// otherwise ignored.
///
/// Cloning is cheap; clones share the same state.
pub struct Resource<E: Endpoint, V> {
    inner: Arc<Inner<E, V>>,
}

impl<E: Endpoint, V> Clone for Resource<E, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Endpoint, V> fmt::Debug for Resource<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("coordinator", &self.inner.coordinator)
            .field("config", &self.inner.config)
            .field("has_value", &self.inner.value.borrow().is_some())
            .finish()
    }
}

impl<E, V> Resource<E, V>
where
    E: Endpoint,
    V: Clone + Send + Sync + 'static,
{
    /// Resource that never touches the resource cache.
    pub fn new(coordinator: EndpointCoordinator<E, V>) -> Self {
        Self::from_parts(coordinator, ResourceConfig::default(), None)
    }

    /// Resource that persists its value according to `config`.
    pub fn with_config(coordinator: EndpointCoordinator<E, V>, config: ResourceConfig) -> Self
    where
        V: Serialize + DeserializeOwned,
    {
        let persistence = Persistence {
            save: save_value::<V>,
            load: load_value::<V>,
        };
        Self::from_parts(coordinator, config, Some(persistence))
    }

    fn from_parts(
        coordinator: EndpointCoordinator<E, V>,
        config: ResourceConfig,
        persistence: Option<Persistence<V>>,
    ) -> Self {
        let (value, _) = watch::channel(None);
        let inner = Arc::new(Inner {
            coordinator,
            config,
            persistence,
            client: Mutex::new(None),
            root_id: Mutex::new(None),
            value,
            listener: Mutex::new(None),
            writes: Arc::default(),
        });

        let weak = Arc::downgrade(&inner);
        inner
            .coordinator
            .set_publish_hook(Arc::new(move |result: &TaskResult<V, ErrorOf<E>>| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let TaskResult::Success(value) = result {
                    let resource = Resource { inner };
                    resource.inner.value.send_replace(Some(value.clone()));
                    resource.persist(value.clone());
                }
            }));

        Self { inner }
    }

    /// The coordinator doing the fetching.
    pub fn coordinator(&self) -> &EndpointCoordinator<E, V> {
        &self.inner.coordinator
    }

    /// Persistence configuration.
    pub fn config(&self) -> &ResourceConfig {
        &self.inner.config
    }

    fn policy(&self) -> CachePolicy {
        self.inner.config.cache_policy
    }

    fn client(&self) -> Option<Arc<ClientOf<E>>> {
        self.inner
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Binds the resource to `client`.
    ///
    /// Records the client's identity, hydrates the value from the resource
    /// cache when allowed and starts following the client's change
    /// notifications. Attaching again replaces the previous binding.
    pub async fn attach(&self, client: &Arc<ClientOf<E>>) {
        *self
            .inner
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::downgrade(client));
        *self
            .inner
            .root_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(client.interface_id());

        self.hydrate(client).await;

        let mut changes = client.subscribe_changes();
        let client = Arc::downgrade(client);
        let resource = Arc::downgrade(&self.inner);
        let listener = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let (Some(client), Some(inner)) = (client.upgrade(), resource.upgrade()) else {
                    break;
                };
                Resource { inner }.refresh(&client);
            }
        });

        let previous = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(listener);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn hydrate(&self, client: &ClientOf<E>) {
        let (Some(persistence), Some(key), Some(cache)) = (
            self.inner.persistence.as_ref(),
            self.inner.config.cache_key(),
            client.resource_cache(),
        ) else {
            return;
        };
        if self.inner.value.borrow().is_some() {
            return;
        }

        match (persistence.load)(cache, key).await {
            Ok(Some(value)) => {
                let filled = self.inner.value.send_if_modified(|slot| {
                    if slot.is_some() {
                        return false;
                    }
                    *slot = Some(value);
                    true
                });
                trace!(%key, filled, "resource hydrated from cache");
            }
            Ok(None) => trace!(%key, "no cached resource value"),
            Err(error) => warn!(%error, %key, "failed to hydrate resource from cache"),
        }
    }

    fn persist(&self, value: V) {
        let (Some(persistence), Some(key)) =
            (self.inner.persistence.as_ref(), self.inner.config.cache_key())
        else {
            return;
        };
        let Some(cache) = self.client().and_then(|client| client.resource_cache().cloned()) else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let save = persistence.save;
        let key = key.clone();
        let writes = self.inner.writes.clone();
        let sequence = writes.queued.fetch_add(1, Ordering::SeqCst) + 1;
        runtime.spawn(async move {
            let mut written = writes.written.lock().await;
            if *written > sequence {
                trace!(%key, sequence, "skipping superseded resource write");
                return;
            }
            match save(&cache, &key, value).await {
                Ok(()) => trace!(%key, sequence, "resource value persisted"),
                Err(error) => warn!(%error, %key, "failed to persist resource value"),
            }
            *written = sequence;
        });
    }

    fn identity_changed(&self, client: &ClientOf<E>) -> bool {
        let root_id = self
            .inner
            .root_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        root_id
            .as_ref()
            .is_some_and(|id| *id != client.interface_id())
    }

    /// Whether reading the resource through `client` should start a fetch.
    ///
    /// True when the client's identity changed since the last fetch, or when
    /// nothing has been fetched, nothing is in flight and the last run was
    /// not canceled. Never true under [`CachePolicy::ReturnCacheDontLoad`],
    /// nor under [`CachePolicy::ReturnCacheElseLoad`] once a value exists.
    pub fn needs_fetch(&self, client: &ClientOf<E>) -> bool {
        let policy = self.policy();
        if !policy.loads() {
            return false;
        }
        if self.identity_changed(client) {
            return true;
        }

        let coordinator = &self.inner.coordinator;
        if matches!(coordinator.state(), TaskState::Running | TaskState::Canceled) {
            return false;
        }
        if policy == CachePolicy::ReturnCacheElseLoad && self.inner.value.borrow().is_some() {
            return false;
        }
        coordinator.last_result().is_none()
    }

    fn refresh(&self, client: &Arc<ClientOf<E>>) {
        if !self.needs_fetch(client) {
            return;
        }
        if let Err(error) = self.fetch(client) {
            debug!(%error, "automatic fetch did not start");
        }
    }

    /// Starts a fetch through `client`, superseding any in flight.
    ///
    /// A changed client identity restarts the coordinator first, so a
    /// paginated resource starts again from its first page.
    pub fn fetch(
        &self,
        client: &Arc<ClientOf<E>>,
    ) -> Result<TaskHandle<V, ErrorOf<E>>, ErrorOf<E>> {
        if self.identity_changed(client) {
            debug!(id = ?client.interface_id(), "client identity changed, restarting resource");
            self.inner.coordinator.reset();
        }
        *self
            .inner
            .root_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(client.interface_id());
        self.inner.coordinator.run(client)
    }

    /// The current value, starting a fetch first if one is warranted.
    ///
    /// Returns immediately; a started fetch publishes to
    /// [`subscribe`](Self::subscribe) when it completes.
    pub fn value(&self, client: &Arc<ClientOf<E>>) -> Option<V> {
        self.refresh(client);
        self.latest_value()
    }

    /// The current value, without side effects.
    pub fn latest_value(&self) -> Option<V> {
        self.inner.value.borrow().clone()
    }

    /// The current value, or a runtime error if nothing was fetched yet.
    pub fn require(&self) -> Result<V, ErrorOf<E>> {
        self.latest_value()
            .ok_or_else(|| <ErrorOf<E>>::runtime(shared(ResourceError::NotFetched)))
    }

    /// Replaces the value and persists it.
    pub fn set_value(&self, value: V) {
        self.inner.value.send_replace(Some(value.clone()));
        self.persist(value);
    }

    /// Receives every value change; `None` after a reset.
    pub fn subscribe(&self) -> watch::Receiver<Option<V>> {
        self.inner.value.subscribe()
    }

    /// Calls `callback` on every value change until the returned
    /// [`Subscription`] is dropped.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&V>) + Send + 'static,
    {
        let mut receiver = self.inner.value.subscribe();
        let task = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let value = receiver.borrow_and_update().clone();
                callback(value.as_ref());
            }
        });
        Subscription { task }
    }

    /// Cancels the fetch in flight. The value is kept.
    ///
    /// Automatic fetching stays off until the next explicit
    /// [`fetch`](Self::fetch).
    pub fn cancel(&self) -> bool {
        self.inner.coordinator.cancel()
    }

    /// Cancels, forgets the last result and clears the value.
    pub fn reset(&self) {
        self.inner.coordinator.reset();
        self.inner.value.send_replace(None);
    }
}

impl<E, V> Dependency<E::Root> for Resource<E, V>
where
    E: Endpoint,
    V: Clone + Send + Sync + 'static,
{
    fn is_resolved(&self, _client: &ClientOf<E>) -> bool {
        self.inner.value.borrow().is_some()
    }

    fn name(&self) -> String {
        format!("resource<{}>", std::any::type_name::<E>())
    }
}

/// Keeps an [`on_change`](Resource::on_change) callback registered.
///
/// Dropping it unregisters the callback.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Unregisters the callback.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
