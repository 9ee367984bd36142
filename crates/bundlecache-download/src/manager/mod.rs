//! Bundle cache implementation.
//!
//! `BundleCache` is the client-facing facade: it owns the registry, the task
//! queue, the local-URL map and the event pipeline, and runs a single
//! long-lived runner that executes tasks one at a time.
//!
//! # Concurrency Model
//!
//! - All scheduler state lives behind one synchronous mutex that is never
//!   held across an await point
//! - `Notify` wakes the runner when work is enqueued
//! - A periodic retry pass re-arms failed tasks and wakes the runner
//! - Each task carries a `CancellationToken`; events about a task are only
//!   emitted under the state lock after checking it, so cancellation plus
//!   event purge is atomic with respect to the orchestrators
//! - Registry writes to the store are serialized by a separate async mutex

mod loader;
mod remover;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use bundlecache_core::{
    Bundle, BundleCacheConfig, BundleEvent, BundleEventListener, BundleRegistry, DirectoryHandle,
    FileOpenOptions, FileSystemPort, FsError, InitError, KeyValueStorePort, MalformedBundleError,
    NewBundle, TransportPort, local_file_name,
};

use crate::pipeline::EventPipeline;
use crate::queue::{TaskKind, TaskOutcome, TaskQueue, TaskSummary};

/// Ports the cache is built on.
#[derive(Clone)]
pub struct BundleCacheDeps {
    /// Persistent store for the registry.
    pub store: Arc<dyn KeyValueStorePort>,
    /// Local file storage.
    pub file_system: Arc<dyn FileSystemPort>,
    /// Network transport.
    pub transport: Arc<dyn TransportPort>,
}

/// Mutable scheduler state, guarded by `BundleCache::state`.
struct CacheState {
    registry: BundleRegistry,
    queue: TaskQueue,
    /// Remote file identifier to resolved local URL.
    local_urls: HashMap<String, String>,
    busy: bool,
}

/// Bundle download cache.
///
/// Created with [`BundleCache::initialize`] or
/// [`BundleCache::initialize_with_listeners`], which start the background
/// runner. The runner holds a reference to the cache until
/// [`BundleCache::shutdown`] is called.
pub struct BundleCache {
    config: BundleCacheConfig,
    registry_key: String,
    store: Arc<dyn KeyValueStorePort>,
    file_system: Arc<dyn FileSystemPort>,
    transport: Arc<dyn TransportPort>,
    directory: DirectoryHandle,
    state: Mutex<CacheState>,
    events: EventPipeline,
    /// Serializes registry writes so the last snapshot taken is the last one stored.
    persist_lock: tokio::sync::Mutex<()>,
    /// Wakes the runner when work is available.
    work_notify: Notify,
    shutdown: CancellationToken,
}

impl BundleCache {
    /// Open the cache directory, restore the registry and start the runner.
    ///
    /// Files of every registered bundle are probed to rebuild the local-URL
    /// map. A bundle persisted as loaded whose files are no longer all
    /// present is demoted, and every bundle that is not loaded gets a Load
    /// task.
    ///
    /// # Errors
    ///
    /// Returns `InitError` if the directory cannot be opened or the
    /// registry cannot be read or decoded.
    pub async fn initialize(
        config: BundleCacheConfig,
        deps: BundleCacheDeps,
    ) -> Result<Arc<Self>, InitError> {
        Self::initialize_with_listeners(config, deps, Vec::new()).await
    }

    /// Like [`BundleCache::initialize`], registering `listeners` before the
    /// runner starts.
    ///
    /// Listeners added later with [`BundleCache::subscribe`] can miss the
    /// events of Loads restored from the registry; these cannot.
    pub async fn initialize_with_listeners(
        config: BundleCacheConfig,
        deps: BundleCacheDeps,
        listeners: Vec<Arc<dyn BundleEventListener>>,
    ) -> Result<Arc<Self>, InitError> {
        let directory = deps
            .file_system
            .get_or_create_directory(&config.base_directory)
            .await
            .map_err(|source| InitError::Directory {
                path: config.base_directory.clone(),
                source,
            })?;

        let registry_key = config.registry_key();
        let stored = deps
            .store
            .get(&registry_key)
            .await
            .map_err(|source| InitError::Store {
                key: registry_key.clone(),
                source,
            })?;
        let mut registry = match stored {
            Some(bytes) => {
                BundleRegistry::from_bytes(&bytes).map_err(|e| InitError::CorruptRegistry {
                    key: registry_key.clone(),
                    message: e.to_string(),
                })?
            }
            None => BundleRegistry::new(),
        };

        let mut local_urls = HashMap::new();
        let mut demoted = 0usize;
        for bundle in registry.bundles() {
            let mut complete = true;
            for remote in &bundle.files {
                if local_urls.contains_key(remote) {
                    continue;
                }
                match probe_local(deps.file_system.as_ref(), &directory, remote).await {
                    Ok(Some(url)) => {
                        local_urls.insert(remote.clone(), url);
                    }
                    Ok(None) => complete = false,
                    Err(e) => {
                        tracing::warn!(
                            target: "bundlecache.scheduler",
                            bundle = %bundle.name,
                            remote = %remote,
                            error = %e,
                            "Cannot probe cached file, treating it as missing"
                        );
                        complete = false;
                    }
                }
            }
            if bundle.loaded && !complete {
                tracing::info!(
                    target: "bundlecache.scheduler",
                    bundle = %bundle.name,
                    "Cached files missing, bundle will be reloaded"
                );
                registry.set_loaded(&bundle.name, false);
                demoted += 1;
            }
        }

        let mut queue = TaskQueue::new();
        for name in registry.names() {
            if !registry.is_loaded(&name) {
                queue.enqueue(&name, TaskKind::Load, None);
            }
        }

        tracing::info!(
            target: "bundlecache.scheduler",
            bundles = registry.len(),
            cached_files = local_urls.len(),
            pending_loads = queue.len(),
            demoted,
            "Bundle cache initialized"
        );

        let cache = Arc::new(Self {
            config,
            registry_key,
            store: deps.store,
            file_system: deps.file_system,
            transport: deps.transport,
            directory,
            state: Mutex::new(CacheState {
                registry,
                queue,
                local_urls,
                busy: false,
            }),
            events: EventPipeline::start(),
            persist_lock: tokio::sync::Mutex::new(()),
            work_notify: Notify::new(),
            shutdown: CancellationToken::new(),
        });

        for listener in listeners {
            cache.events.subscribe(listener);
        }

        if demoted > 0 {
            cache.persist().await;
        }

        cache.start_background();
        cache.work_notify.notify_one();
        Ok(cache)
    }

    /// Register an event listener.
    pub fn subscribe(&self, listener: impl BundleEventListener + 'static) {
        self.events.subscribe(Arc::new(listener));
    }

    /// Register a bundle and schedule it for loading.
    ///
    /// Registering a name that already exists is a no-op. A pending Remove
    /// of the same name is canceled, so removing and re-adding a bundle
    /// keeps its shared files.
    ///
    /// # Errors
    ///
    /// Returns `MalformedBundleError` if the bundle fails validation; no
    /// state is touched in that case.
    pub async fn add_bundle(&self, bundle: NewBundle) -> Result<(), MalformedBundleError> {
        bundle.validate()?;
        let name = bundle.name.clone();
        let files = bundle.files.len();

        {
            let mut state = self.lock_state();
            if !state.registry.insert(bundle) {
                tracing::debug!(
                    target: "bundlecache.scheduler",
                    bundle = %name,
                    "Bundle already registered"
                );
                return Ok(());
            }
            if state.queue.cancel(&name, TaskKind::Remove) {
                self.events.purge(&name);
            }
            state.queue.enqueue(&name, TaskKind::Load, None);
        }

        self.persist().await;
        tracing::info!(target: "bundlecache.scheduler", bundle = %name, files, "Bundle added");
        self.work_notify.notify_one();
        Ok(())
    }

    /// Unregister a bundle and schedule deletion of its unshared files.
    ///
    /// Removing an unknown name is a no-op. A pending or in-flight Load of
    /// the same name is canceled and its undelivered events are dropped.
    pub async fn remove_bundle(&self, name: &str) {
        {
            let mut state = self.lock_state();
            let Some(snapshot) = state.registry.remove(name) else {
                tracing::debug!(
                    target: "bundlecache.scheduler",
                    bundle = name,
                    "Remove of unknown bundle ignored"
                );
                return;
            };
            if state.queue.cancel(name, TaskKind::Load) {
                self.events.purge(name);
            }
            state.queue.enqueue(name, TaskKind::Remove, Some(snapshot));
        }

        self.persist().await;
        tracing::info!(target: "bundlecache.scheduler", bundle = name, "Bundle removed");
        self.work_notify.notify_one();
    }

    /// Registered bundle names, in registration order.
    pub fn bundle_names(&self) -> Vec<String> {
        self.lock_state().registry.names()
    }

    /// Copy of a registered bundle.
    pub fn bundle(&self, name: &str) -> Option<Bundle> {
        self.lock_state().registry.get(name)
    }

    /// Copies of every registered bundle, in registration order.
    pub fn bundles(&self) -> Vec<Bundle> {
        self.lock_state().registry.bundles()
    }

    /// Whether a bundle with this name is registered.
    pub fn bundle_exists(&self, name: &str) -> bool {
        self.lock_state().registry.contains(name)
    }

    /// Whether the named bundle is registered and fully loaded.
    pub fn bundle_is_loaded(&self, name: &str) -> bool {
        self.lock_state().registry.is_loaded(name)
    }

    /// Local URL of a cached remote file.
    pub fn local_url(&self, remote: &str) -> Option<String> {
        self.lock_state().local_urls.get(remote).cloned()
    }

    /// Whether the runner is currently draining the queue.
    pub fn is_busy(&self) -> bool {
        self.lock_state().busy
    }

    /// Read-only view of the task queue.
    pub fn queue_snapshot(&self) -> Vec<TaskSummary> {
        self.lock_state().queue.snapshot()
    }

    /// Re-arm failed tasks now instead of waiting for the retry interval.
    ///
    /// Returns the number of tasks re-armed.
    pub fn retry_failed_now(&self) -> usize {
        let rearmed = self.lock_state().queue.rearm_retries();
        if rearmed > 0 {
            tracing::info!(target: "bundlecache.scheduler", rearmed, "Retrying failed tasks");
            self.work_notify.notify_one();
        }
        rearmed
    }

    /// Stop the runner and the retry timer.
    ///
    /// The in-flight task is canceled and its partial file discarded.
    /// Queued tasks are dropped; Loads are re-created from the registry on
    /// the next initialization. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let canceled = self.lock_state().queue.cancel_all();
        self.shutdown.cancel();
        tracing::info!(target: "bundlecache.scheduler", canceled, "Bundle cache shut down");
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emit a task's event unless the task has been canceled.
    fn emit_for_task(&self, cancel: &CancellationToken, event: BundleEvent) -> bool {
        // Holding the state lock orders this against cancel + purge
        let _state = self.lock_state();
        if cancel.is_cancelled() {
            return false;
        }
        self.events.emit(event);
        true
    }

    /// Write the registry to the store. Failures are logged, not propagated.
    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let encoded = self.lock_state().registry.to_bytes();
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    target: "bundlecache.registry",
                    error = %e,
                    "Failed to encode bundle registry"
                );
                return;
            }
        };
        if let Err(e) = self.store.set(&self.registry_key, &bytes).await {
            tracing::warn!(
                target: "bundlecache.registry",
                key = %self.registry_key,
                error = %e,
                "Failed to persist bundle registry"
            );
        }
    }

    fn start_background(self: &Arc<Self>) {
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            runner.run_loop().await;
        });
        let retry = Arc::clone(self);
        tokio::spawn(async move {
            retry.retry_loop().await;
        });
    }

    /// Long-lived runner: sleeps until notified, then drains the queue.
    async fn run_loop(&self) {
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                () = self.work_notify.notified() => {}
            }
            self.drain().await;
        }
        tracing::debug!(target: "bundlecache.scheduler", "Runner stopped");
    }

    /// Periodic retry pass over failed tasks.
    async fn retry_loop(&self) {
        let period = self.config.retry_interval();
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                _ = tick.tick() => {
                    let rearmed = self.lock_state().queue.rearm_retries();
                    if rearmed > 0 {
                        tracing::debug!(target: "bundlecache.scheduler", rearmed, "Retry pass");
                        self.work_notify.notify_one();
                    }
                }
            }
        }
    }

    /// Run tasks until nothing is runnable.
    ///
    /// `busy` is raised when the first task of a run starts and lowered when
    /// the queue has nothing runnable left.
    async fn drain(&self) {
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }
            let run = {
                let mut state = self.lock_state();
                let stripped = state.queue.strip_canceled();
                if stripped > 0 {
                    tracing::debug!(target: "bundlecache.scheduler", stripped, "Dropped canceled tasks");
                }
                match state.queue.next_runnable() {
                    Some(run) => {
                        if !state.busy {
                            state.busy = true;
                            self.events.emit(BundleEvent::Busy);
                        }
                        run
                    }
                    None => {
                        if state.busy {
                            tracing::debug!(
                                target: "bundlecache.scheduler",
                                awaiting_retry = state.queue.awaiting_retry(),
                                "Queue idle"
                            );
                            state.busy = false;
                            self.events.emit(BundleEvent::NotBusy);
                        }
                        return;
                    }
                }
            };

            tracing::debug!(
                target: "bundlecache.scheduler",
                task = %run.id,
                bundle = %run.bundle_name,
                kind = %run.kind,
                "Running task"
            );
            let outcome = match run.kind {
                TaskKind::Load => self.run_load(&run).await,
                TaskKind::Remove => self.run_remove(&run).await,
            };
            if outcome == TaskOutcome::Cancelled {
                tracing::info!(
                    target: "bundlecache.scheduler",
                    bundle = %run.bundle_name,
                    kind = %run.kind,
                    "Task cancelled"
                );
            }
            self.lock_state().queue.complete(run.id, outcome);
        }
    }
}

/// Look for the cached copy of `remote`, returning its URL when present.
async fn probe_local(
    file_system: &dyn FileSystemPort,
    directory: &DirectoryHandle,
    remote: &str,
) -> Result<Option<String>, FsError> {
    let name = local_file_name(remote);
    match file_system
        .get_file(directory, &name, FileOpenOptions::existing())
        .await
    {
        Ok(handle) => Ok(Some(file_system.resolve_url(&handle))),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
