//! Endpoint task coordinator.
//!
//! # Lifecycle
//!
//! `Idle -> Running -> {Succeeded, Failed, Canceled}`, back to `Idle` on
//! [`reset`](EndpointCoordinator::reset).
//!
//! # Run
//! 1. Cancel the in-flight run, if any (last caller wins)
//! 2. Check dependencies; fail without I/O if one is unresolved
//! 3. Resolve endpoint, input and options from the client
//! 4. For paginated coordinators, point the options at the previous
//!    list's next cursor, or start over from the first page once the
//!    previous list is terminal
//! 5. Spawn the fetch: fast path, transport, decode, output mapping
//! 6. Concatenate with the previous list (paginated), publish, clear the
//!    in-flight slot
//!
//! A run that is no longer the current one never publishes. Its
//! [`TaskHandle`] resolves to [`TaskResult::Canceled`]. A run aborted from
//! outside, e.g. by [`Client::shutdown`], publishes `Canceled`.
//!
//! Publications are numbered under the state lock and a publication older
//! than one already delivered is dropped, so subscribers and the publish
//! hook observe results in run order.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use courier_core::{
    BoxError, CursorPaginated, Endpoint, Interface, InterfaceError, PaginatedList,
    PaginationCursor, PaginationError, TaskResult, TaskState, WorkId, shared,
};
use futures::future::AbortHandle;
use tokio::sync::{oneshot, watch};
use tracing::{Instrument, debug, info_span};

use crate::client::{Client, classify};
use crate::dependency::Dependency;
use crate::error::ResourceError;
use crate::metrics::{self, Event};

type ErrorOf<E> = <<E as Endpoint>::Root as Interface>::Error;
type ClientOf<E> = Client<<E as Endpoint>::Root>;

type EndpointFn<E> =
    dyn Fn(&<E as Endpoint>::Root) -> Result<Arc<E>, BoxError> + Send + Sync;
type InputFn<E> =
    dyn Fn(&ClientOf<E>) -> Result<<E as Endpoint>::Input, BoxError> + Send + Sync;
type OutputFn<E, V> = dyn Fn(<E as Endpoint>::Output) -> Result<V, BoxError> + Send + Sync;
type PublishHook<V, Err> = Arc<dyn Fn(&TaskResult<V, Err>) + Send + Sync>;

struct Pagination<O, V> {
    is_terminal: fn(&V) -> bool,
    next_cursor: fn(&V) -> Option<PaginationCursor>,
    inject: fn(&mut O, Option<PaginationCursor>),
    merge: fn(&mut V, V) -> Result<(), PaginationError>,
}

struct InFlight {
    generation: u64,
    transport: AbortHandle,
}

struct State<V, Err> {
    last_result: Option<TaskResult<V, Err>>,
    in_flight: Option<InFlight>,
    generation: u64,
    publications: u64,
    phase: TaskState,
}

impl<V, Err> State<V, Err> {
    /// Whether run `generation` is the one in flight.
    fn is_current(&self, generation: u64) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == generation)
    }

    /// Numbers the next publication.
    fn next_publication(&mut self) -> u64 {
        self.publications += 1;
        self.publications
    }

    /// Aborts the in-flight transport call and invalidates its run.
    fn supersede(&mut self) -> bool {
        match self.in_flight.take() {
            Some(in_flight) => {
                in_flight.transport.abort();
                self.generation += 1;
                true
            }
            None => false,
        }
    }
}

struct Shared<V, Err> {
    state: Mutex<State<V, Err>>,
    results: watch::Sender<Option<TaskResult<V, Err>>>,
    hook: Mutex<Option<PublishHook<V, Err>>>,
    /// Number of the latest delivered publication.
    published: Mutex<u64>,
}

impl<V: Clone, Err: Clone> Shared<V, Err> {
    fn lock(&self) -> MutexGuard<'_, State<V, Err>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn new(results: watch::Sender<Option<TaskResult<V, Err>>>) -> Self {
        Self {
            state: Mutex::new(State {
                last_result: None,
                in_flight: None,
                generation: 0,
                publications: 0,
                phase: TaskState::Idle,
            }),
            results,
            hook: Mutex::new(None),
            published: Mutex::new(0),
        }
    }

    /// Delivers publication `number` unless a later one was delivered first.
    ///
    /// Must be called without the state lock held: the hook may drop the
    /// last handle on the owning coordinator.
    fn publish(&self, number: u64, result: Option<TaskResult<V, Err>>) {
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        if *published > number {
            debug!(number, latest = *published, "dropping stale publication");
            return;
        }
        *published = number;

        if let Some(result) = &result {
            let hook = self
                .hook
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(hook) = hook {
                hook(result);
            }
        }
        self.results.send_replace(result);
    }

    /// Records the terminal result of run `generation`.
    ///
    /// Returns what the run's handle resolves to: the published result, or
    /// `Canceled` if the run was superseded.
    fn complete<M>(&self, generation: u64, result: TaskResult<V, Err>, merge: Option<M>) -> TaskResult<V, Err>
    where
        M: FnOnce(&mut V, V) -> Result<(), Err>,
    {
        let mut state = self.lock();
        if !state.is_current(generation) {
            debug!(generation, "discarding result of superseded run");
            return TaskResult::Canceled;
        }
        state.in_flight = None;

        let result = match (merge, result) {
            (Some(merge), TaskResult::Success(next)) => match state.last_result.take() {
                Some(TaskResult::Success(mut previous)) => match merge(&mut previous, next) {
                    Ok(()) => TaskResult::Success(previous),
                    Err(error) => TaskResult::Error(error),
                },
                _ => TaskResult::Success(next),
            },
            (_, result) => result,
        };

        state.phase = result.state();
        state.last_result = Some(result.clone());
        let number = state.next_publication();
        drop(state);

        self.publish(number, Some(result.clone()));
        result
    }

    /// Marks run `generation` canceled after its task was aborted from outside.
    fn abandon(&self, generation: u64) {
        let mut state = self.lock();
        if !state.is_current(generation) {
            return;
        }
        state.in_flight = None;
        state.phase = TaskState::Canceled;
        let number = state.next_publication();
        drop(state);

        debug!(generation, "run aborted before completing");
        self.publish(number, Some(TaskResult::Canceled));
    }
}

/// Owns the sender of one run's [`TaskHandle`].
///
/// Dropped without [`finish`](Self::finish), i.e. when the task is aborted,
/// it cancels the run and resolves the handle to `Canceled`.
struct RunGuard<V: Clone, Err: Clone> {
    shared: Weak<Shared<V, Err>>,
    generation: u64,
    sender: Option<oneshot::Sender<TaskResult<V, Err>>>,
}

impl<V: Clone, Err: Clone> RunGuard<V, Err> {
    fn finish(mut self, result: TaskResult<V, Err>) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(result);
        }
    }
}

impl<V: Clone, Err: Clone> Drop for RunGuard<V, Err> {
    fn drop(&mut self) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        if let Some(shared) = self.shared.upgrade() {
            shared.abandon(self.generation);
        }
        let _ = sender.send(TaskResult::Canceled);
    }
}

/// Future resolving to the result of one [`run`](EndpointCoordinator::run).
///
/// Resolves to [`TaskResult::Canceled`] if the run was canceled,
/// superseded by a later run, or aborted by client shutdown.
pub struct TaskHandle<V, Err> {
    receiver: oneshot::Receiver<TaskResult<V, Err>>,
    work: WorkId,
}

impl<V, Err> TaskHandle<V, Err> {
    /// Identifier of the task in the session's outstanding work.
    pub fn work_id(&self) -> WorkId {
        self.work
    }
}

impl<V, Err> fmt::Debug for TaskHandle<V, Err> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("work", &self.work).finish()
    }
}

impl<V, Err> Future for TaskHandle<V, Err> {
    type Output = TaskResult<V, Err>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(TaskResult::Canceled))
    }
}

/// Runs one endpoint on behalf of one logical resource.
///
/// The coordinator owns the last published result and at most one in-flight
/// run. The client is passed to every [`run`](Self::run) rather than stored.
///
/// ```ignore
/// let coordinator = EndpointCoordinator::new(GetUser, UserId(42))
///     .map_output(|user: User| Ok(user.name));
///
/// let name = coordinator.run(&client)?.await;
/// ```
pub struct EndpointCoordinator<E: Endpoint, V> {
    endpoint: Arc<EndpointFn<E>>,
    input: Arc<InputFn<E>>,
    output: Arc<OutputFn<E, V>>,
    options: Option<E::Options>,
    dependencies: Vec<Arc<dyn Dependency<E::Root>>>,
    pagination: Option<Pagination<E::Options, V>>,
    shared: Arc<Shared<V, ErrorOf<E>>>,
}

impl<E: Endpoint, V> fmt::Debug for EndpointCoordinator<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EndpointCoordinator")
            .field("endpoint", &std::any::type_name::<E>())
            .field("state", &state.phase)
            .field("dependencies", &self.dependencies.len())
            .field("paginated", &self.pagination.is_some())
            .finish()
    }
}

impl<E> EndpointCoordinator<E, E::Output>
where
    E: Endpoint,
    E::Output: Clone + Send + Sync,
{
    /// Coordinator running `endpoint` with a fixed `input`.
    pub fn new(endpoint: E, input: E::Input) -> Self
    where
        E::Input: Clone,
    {
        let endpoint = Arc::new(endpoint);
        Self::from_parts(
            Arc::new(move |_: &E::Root| Ok::<_, BoxError>(endpoint.clone())),
            Arc::new(move |_: &ClientOf<E>| Ok::<_, BoxError>(input.clone())),
            Arc::new(|output: E::Output| Ok::<_, BoxError>(output)),
        )
    }

    /// Coordinator that resolves its endpoint from the current interface on
    /// every run.
    pub fn resolving<F>(resolve: F, input: E::Input) -> Self
    where
        F: Fn(&E::Root) -> Result<E, BoxError> + Send + Sync + 'static,
        E::Input: Clone,
    {
        Self::from_parts(
            Arc::new(move |root: &E::Root| resolve(root).map(Arc::new)),
            Arc::new(move |_: &ClientOf<E>| Ok::<_, BoxError>(input.clone())),
            Arc::new(|output: E::Output| Ok::<_, BoxError>(output)),
        )
    }
}

impl<E, V> EndpointCoordinator<E, V>
where
    E: Endpoint,
    V: Clone + Send + Sync + 'static,
{
    fn from_parts(
        endpoint: Arc<EndpointFn<E>>,
        input: Arc<InputFn<E>>,
        output: Arc<OutputFn<E, V>>,
    ) -> Self {
        let (results, _) = watch::channel(None);
        Self {
            endpoint,
            input,
            output,
            options: None,
            dependencies: Vec::new(),
            pagination: None,
            shared: Arc::new(Shared::new(results)),
        }
    }

    /// Resolves the input from the client on every run.
    pub fn resolve_input<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&ClientOf<E>) -> Result<E::Input, BoxError> + Send + Sync + 'static,
    {
        self.input = Arc::new(resolve);
        self
    }

    /// Maps the endpoint output into the published value.
    ///
    /// Replaces any previous mapping. Pagination must be enabled after this.
    pub fn map_output<T, F>(mut self, map: F) -> EndpointCoordinator<E, T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(E::Output) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let mut coordinator =
            EndpointCoordinator::from_parts(self.endpoint.clone(), self.input.clone(), Arc::new(map));
        coordinator.options = self.options.take();
        coordinator.dependencies = std::mem::take(&mut self.dependencies);
        coordinator
    }

    /// Uses `options` instead of the endpoint's defaults.
    pub fn with_options(mut self, options: E::Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Refuses to run until `dependency` is resolved.
    pub fn depends_on<D: Dependency<E::Root>>(mut self, dependency: D) -> Self {
        self.dependencies.push(Arc::new(dependency));
        self
    }

    /// The last published terminal result, kept across cancellation.
    pub fn last_result(&self) -> Option<TaskResult<V, ErrorOf<E>>> {
        self.shared.lock().last_result.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.shared.lock().phase
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    /// Receives every published result; `None` after a reset.
    pub fn subscribe(&self) -> watch::Receiver<Option<TaskResult<V, ErrorOf<E>>>> {
        self.shared.results.subscribe()
    }

    pub(crate) fn set_publish_hook(&self, hook: PublishHook<V, ErrorOf<E>>) {
        *self
            .shared
            .hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    /// Checks every declared dependency against `client`.
    pub fn validate_dependencies(&self, client: &ClientOf<E>) -> Result<(), ResourceError> {
        match self.dependencies.iter().find(|dependency| !dependency.is_resolved(client)) {
            Some(dependency) => Err(ResourceError::DependencyNotResolved(dependency.name())),
            None => Ok(()),
        }
    }

    /// Marks a run that failed before any I/O.
    ///
    /// The last result is left alone, so a resource retries once the
    /// precondition holds.
    fn fail(&self, error: ResourceError) -> ErrorOf<E> {
        self.shared.lock().phase = TaskState::Failed;
        metrics::record(std::any::type_name::<E>(), Event::Failed);
        <ErrorOf<E>>::runtime(shared(error))
    }

    /// Starts a run, canceling the one in flight.
    ///
    /// Fails without touching the cache or the transport when a dependency
    /// is unresolved or the endpoint cannot be resolved; such failures are
    /// returned here and never published. Must be called within a tokio
    /// runtime.
    pub fn run(
        &self,
        client: &Arc<ClientOf<E>>,
    ) -> Result<TaskHandle<V, ErrorOf<E>>, ErrorOf<E>> {
        let name = std::any::type_name::<E>();
        metrics::record(name, Event::RunStarted);

        if self.shared.lock().supersede() {
            debug!(endpoint = name, "superseding in-flight run");
        }

        if let Err(error) = self.validate_dependencies(client) {
            debug!(%error, endpoint = name, "dependency gate closed");
            return Err(self.fail(error));
        }

        let root = client.interface();
        let resolved = (self.endpoint)(root.as_ref()).and_then(|endpoint| {
            let input = (self.input)(client.as_ref())?;
            Ok((endpoint, input))
        });
        let (endpoint, input) = match resolved {
            Ok(resolved) => resolved,
            Err(error) => {
                return Err(self.fail(ResourceError::EndpointResolution(Arc::from(error))));
            }
        };
        let mut options = self
            .options
            .clone()
            .unwrap_or_else(|| endpoint.default_options());

        let (sender, receiver) = oneshot::channel();

        let mut state = self.shared.lock();
        let mut continues = false;
        if let Some(pagination) = &self.pagination
            && let Some(TaskResult::Success(previous)) = &state.last_result
        {
            if (pagination.is_terminal)(previous) {
                debug!(endpoint = name, "pages exhausted, restarting from the first page");
            } else {
                (pagination.inject)(&mut options, (pagination.next_cursor)(previous));
                continues = true;
            }
        }

        state.generation += 1;
        let generation = state.generation;
        let (transport, task) =
            self.fetch(client.clone(), endpoint, input, options, generation, continues);
        let guard = RunGuard {
            shared: Arc::downgrade(&self.shared),
            generation,
            sender: Some(sender),
        };
        let span = info_span!("courier.fetch", endpoint = name, generation);
        // Spawned under the lock so the task cannot complete before it is registered.
        let (work, _) = client
            .session()
            .outstanding()
            .spawn(async move {
                let result = task.await;
                guard.finish(result);
            }.instrument(span));
        state.in_flight = Some(InFlight { generation, transport });
        state.phase = TaskState::Running;
        drop(state);

        debug!(endpoint = name, generation, %work, "run started");
        Ok(TaskHandle { receiver, work })
    }

    /// Builds the task of run `generation` and the handle aborting its
    /// transport call. `continues` merges the result into the last list.
    fn fetch(
        &self,
        client: Arc<ClientOf<E>>,
        endpoint: Arc<E>,
        input: E::Input,
        options: E::Options,
        generation: u64,
        continues: bool,
    ) -> (
        AbortHandle,
        impl Future<Output = TaskResult<V, ErrorOf<E>>> + Send + 'static,
    ) {
        let (transport, registration) = AbortHandle::new_pair();
        let slot = self.shared.clone();
        let output = self.output.clone();
        let merge = self
            .pagination
            .as_ref()
            .filter(|_| continues)
            .map(|pagination| pagination.merge);
        let name = std::any::type_name::<E>();

        let task = async move {
            let result = client
                .perform(endpoint.as_ref(), &input, &options, Some(registration))
                .await;
            let result = match result {
                TaskResult::Success(value) => match output(value) {
                    Ok(value) => TaskResult::Success(value),
                    Err(error) => TaskResult::Error(classify::<E::Root>(error)),
                },
                TaskResult::Error(error) => TaskResult::Error(error),
                TaskResult::Canceled => TaskResult::Canceled,
            };
            match &result {
                TaskResult::Error(_) => metrics::record(name, Event::Failed),
                TaskResult::Canceled => metrics::record(name, Event::Canceled),
                TaskResult::Success(_) => {}
            }

            let merge = merge.map(|merge| {
                move |previous: &mut V, next: V| {
                    merge(previous, next).map_err(|error| <ErrorOf<E>>::runtime(shared(error)))
                }
            });
            slot.complete(generation, result, merge)
        };
        (transport, task)
    }

    /// Cancels the in-flight run.
    ///
    /// Publishes [`TaskResult::Canceled`] but keeps the last result, so a
    /// paginated coordinator resumes from the same cursor next time.
    /// Returns `false` if nothing was running.
    pub fn cancel(&self) -> bool {
        let mut state = self.shared.lock();
        if !state.supersede() {
            return false;
        }
        state.phase = TaskState::Canceled;
        let number = state.next_publication();
        drop(state);

        debug!(endpoint = std::any::type_name::<E>(), "run canceled");
        metrics::record(std::any::type_name::<E>(), Event::Canceled);
        self.shared.publish(number, Some(TaskResult::Canceled));
        true
    }

    /// Cancels, then forgets the last result.
    pub fn reset(&self) {
        let number = {
            let mut state = self.shared.lock();
            state.supersede();
            state.last_result = None;
            state.phase = TaskState::Idle;
            state.next_publication()
        };
        self.shared.publish(number, None);
    }
}

impl<E, T> EndpointCoordinator<E, PaginatedList<T>>
where
    E: Endpoint,
    E::Options: CursorPaginated,
    T: Clone + Send + Sync + 'static,
{
    /// Turns every run after the first into "fetch the next page".
    ///
    /// Each run points the options at the previous list's next cursor and
    /// concatenates the new list onto it, keeping earlier pages. A run after
    /// the terminal page starts over from the first page and replaces the
    /// list.
    pub fn paginated(mut self) -> Self {
        self.pagination = Some(Pagination {
            is_terminal: |list| list.is_terminal(),
            next_cursor: |list| list.next_cursor().cloned(),
            inject: |options, cursor| options.set_pagination_cursor(cursor),
            merge: |list, page| list.concatenate(page),
        });
        self
    }

    /// Whether the last page has been fetched.
    pub fn is_exhausted(&self) -> bool {
        matches!(
            &self.shared.lock().last_result,
            Some(TaskResult::Success(list)) if list.is_terminal()
        )
    }
}

impl<E: Endpoint, V> Drop for EndpointCoordinator<E, V> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.supersede();
    }
}
