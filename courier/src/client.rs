use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use courier_backend::{CodingCache, KeyedCache, NoopCache};
use courier_core::{
    BoxError, BuildContext, DecodeContext, Endpoint, Interface, InterfaceError, RequestErrorOf,
    RequestOf, ResponseOf, Session, TaskResult, TransportError,
};
use futures::future::{AbortRegistration, Abortable};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::metrics::{self, Event};

/// Cache of raw responses keyed by the request that produced them.
pub type SessionCache<I> = Arc<dyn KeyedCache<RequestOf<I>, ResponseOf<I>>>;

/// Transport shared by a client.
pub type SharedSession<I> = Arc<dyn Session<Request = RequestOf<I>>>;

/// Binds an interface to a session and caches.
///
/// The client is the single source of truth for the current interface.
/// Coordinators read it, never mutate it; re-pointing it with
/// [`set_interface`](Self::set_interface) notifies every attached resource.
pub struct Client<I: Interface> {
    interface: RwLock<Arc<I>>,
    session: SharedSession<I>,
    session_cache: SessionCache<I>,
    resource_cache: Option<CodingCache>,
    changes: watch::Sender<u64>,
}

impl<I: Interface> fmt::Debug for Client<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("interface", &self.interface_id())
            .field("session_cache", &self.session_cache.name())
            .field("resource_cache", &self.resource_cache)
            .finish()
    }
}

impl<I: Interface> Client<I> {
    /// Starts building a client for `interface` over `session`.
    pub fn builder<S>(interface: I, session: S) -> ClientBuilder<I>
    where
        S: Session<Request = RequestOf<I>>,
    {
        ClientBuilder {
            interface,
            session: Arc::new(session),
            session_cache: Arc::new(NoopCache),
            resource_cache: None,
        }
    }

    /// Snapshot of the current interface.
    pub fn interface(&self) -> Arc<I> {
        self.interface
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Identity of the current interface.
    pub fn interface_id(&self) -> I::Id {
        self.interface().id()
    }

    /// Re-points the client and notifies subscribers.
    pub fn set_interface(&self, interface: I) {
        *self
            .interface
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(interface);
        debug!(id = ?self.interface_id(), "client interface replaced");
        self.notify_change();
    }

    /// Notifies subscribers without changing the interface.
    pub fn notify_change(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }

    /// Receives a new revision on every change notification.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// The transport.
    pub fn session(&self) -> &SharedSession<I> {
        &self.session
    }

    /// Cache of raw responses keyed by request.
    pub fn session_cache(&self) -> &SessionCache<I> {
        &self.session_cache
    }

    /// Cache resources persist their values in.
    pub fn resource_cache(&self) -> Option<&CodingCache> {
        self.resource_cache.as_ref()
    }

    /// Cancels every task running on behalf of the session.
    pub fn shutdown(&self) {
        debug!("cancelling outstanding client work");
        self.session.outstanding().cancel_all();
    }

    /// Runs `endpoint` once, outside any coordinator.
    pub async fn run<E>(
        &self,
        endpoint: &E,
        input: E::Input,
        options: E::Options,
    ) -> TaskResult<E::Output, I::Error>
    where
        E: Endpoint<Root = I>,
    {
        self.perform(endpoint, &input, &options, None).await
    }

    /// Runs `endpoint` with its default options.
    pub async fn run_default<E>(&self, endpoint: &E, input: E::Input) -> TaskResult<E::Output, I::Error>
    where
        E: Endpoint<Root = I>,
    {
        let options = endpoint.default_options();
        self.perform(endpoint, &input, &options, None).await
    }

    /// Builds, looks up, executes and decodes one request.
    ///
    /// When `registration` is given only the transport call is abortable;
    /// once a response has arrived, decoding and the cache write complete.
    pub(crate) async fn perform<E>(
        &self,
        endpoint: &E,
        input: &E::Input,
        options: &E::Options,
        registration: Option<AbortRegistration>,
    ) -> TaskResult<E::Output, I::Error>
    where
        E: Endpoint<Root = I>,
    {
        let name = std::any::type_name::<E>();
        let root = self.interface();

        let mut request = match endpoint.build(
            input,
            BuildContext {
                root: root.as_ref(),
                options,
            },
        ) {
            Ok(request) => request,
            Err(error) => {
                debug!(%error, endpoint = name, "failed to build request");
                return TaskResult::Error(classify::<I>(error));
            }
        };
        root.prepare_request(&mut request);

        let decode = |response: ResponseOf<I>, request: &RequestOf<I>| {
            endpoint.decode(
                response,
                DecodeContext {
                    root: root.as_ref(),
                    input,
                    options,
                    request,
                },
            )
        };

        match self.session_cache.get_fast_path(&request) {
            Ok(Some(response)) => match decode(response, &request) {
                Ok(output) => {
                    debug!(endpoint = name, "served from session cache fast path");
                    metrics::record(name, Event::FastPathHit);
                    return TaskResult::Success(output);
                }
                Err(error) => trace!(%error, endpoint = name, "cached response did not decode"),
            },
            Ok(None) => {}
            Err(error) => trace!(%error, endpoint = name, "session cache fast path failed"),
        }

        metrics::record(name, Event::TransportCall);
        let call = self.session.execute(request.clone());
        let response = match registration {
            Some(registration) => match Abortable::new(call, registration).await {
                Ok(response) => response,
                Err(_aborted) => return TaskResult::Canceled,
            },
            None => call.await,
        };

        let response = match response {
            Ok(response) => response,
            Err(TransportError::Canceled) => return TaskResult::Canceled,
            Err(TransportError::Request(error)) => {
                debug!(%error, endpoint = name, "request failed");
                return TaskResult::Error(I::Error::bad_request(error));
            }
        };

        match decode(response.clone(), &request) {
            Ok(output) => {
                if let Err(error) = self.session_cache.put(response, &request).await {
                    warn!(%error, endpoint = name, "failed to cache response");
                }
                TaskResult::Success(output)
            }
            Err(error) => {
                debug!(%error, endpoint = name, "failed to decode response");
                TaskResult::Error(classify::<I>(error))
            }
        }
    }
}

/// Maps an endpoint failure into the interface's error type.
///
/// Errors that already are the interface error pass through, the native
/// request error becomes a bad request and anything else is a runtime error.
pub(crate) fn classify<I: Interface>(error: BoxError) -> I::Error {
    let error = match error.downcast::<I::Error>() {
        Ok(error) => return *error,
        Err(error) => error,
    };
    match error.downcast::<RequestErrorOf<I>>() {
        Ok(native) => I::Error::bad_request(*native),
        Err(other) => I::Error::runtime(Arc::from(other)),
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder<I: Interface> {
    interface: I,
    session: SharedSession<I>,
    session_cache: SessionCache<I>,
    resource_cache: Option<CodingCache>,
}

impl<I: Interface> ClientBuilder<I> {
    /// Caches raw responses in `cache`, enabling the fast path.
    ///
    /// Default: [`NoopCache`].
    pub fn session_cache<C>(mut self, cache: C) -> Self
    where
        C: KeyedCache<RequestOf<I>, ResponseOf<I>> + 'static,
    {
        self.session_cache = Arc::new(cache);
        self
    }

    /// Uses an already shared session cache.
    pub fn shared_session_cache(mut self, cache: SessionCache<I>) -> Self {
        self.session_cache = cache;
        self
    }

    /// Persists resource values in `cache`.
    pub fn resource_cache(mut self, cache: CodingCache) -> Self {
        self.resource_cache = Some(cache);
        self
    }

    /// Creates the client.
    pub fn build(self) -> Arc<Client<I>> {
        let (changes, _) = watch::channel(0);
        Arc::new(Client {
            interface: RwLock::new(Arc::new(self.interface)),
            session: self.session,
            session_cache: self.session_cache,
            resource_cache: self.resource_cache,
            changes,
        })
    }
}
