//! Shared fakes and helpers for bundle cache integration tests.
//!
//! Nothing here touches the real filesystem or network: files live in a
//! set of paths and transfers follow a per-URI script.

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};
use tracing_subscriber::EnvFilter;

use bundlecache_core::{
    DirectoryHandle, FileHandle, FileOpenOptions, FileSystemPort, FsError, MemoryStore,
    ProgressFn, TransportError, TransportPort, local_file_name,
};
use bundlecache_download::{
    BundleCache, BundleCacheConfig, BundleCacheDeps, BundleEvent, BundleEventListener,
    ChannelListener,
};

/// Base directory used by every harness.
pub const BASE_DIR: &str = "assets";

/// Install a fmt subscriber filtered by `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Filesystem ─────────────────────────────────────────────────────

/// In-memory filesystem provider.
#[derive(Default)]
pub struct FakeFileSystem {
    files: Mutex<HashSet<PathBuf>>,
    fail_directory: bool,
    removal_gate: Mutex<Option<RemovalGate>>,
    removals: AtomicUsize,
}

/// Holds the next `remove_file` call until released.
#[derive(Clone, Default)]
pub struct RemovalGate {
    /// Notified once the held removal has started.
    pub entered: Arc<Notify>,
    /// Notify to let the held removal finish.
    pub release: Arc<Notify>,
}

impl FakeFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose directory creation always fails.
    pub fn failing_directory() -> Self {
        Self {
            fail_directory: true,
            ..Self::default()
        }
    }

    fn path_for(remote: &str) -> PathBuf {
        DirectoryHandle::new(BASE_DIR).child(&local_file_name(remote))
    }

    /// Pretend `remote` was cached by an earlier run.
    pub fn seed(&self, remote: &str) {
        self.files.lock().unwrap().insert(Self::path_for(remote));
    }

    /// Whether the cached copy of `remote` exists.
    pub fn has(&self, remote: &str) -> bool {
        self.files.lock().unwrap().contains(&Self::path_for(remote))
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    /// Block the next file removal until the returned gate is released.
    pub fn gate_next_removal(&self) -> RemovalGate {
        let gate = RemovalGate::default();
        *self.removal_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Number of files deleted so far.
    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileSystemPort for FakeFileSystem {
    async fn get_or_create_directory(&self, path: &str) -> Result<DirectoryHandle, FsError> {
        if self.fail_directory {
            return Err(FsError::io("PermissionDenied", "read-only volume"));
        }
        Ok(DirectoryHandle::new(path))
    }

    async fn get_file(
        &self,
        dir: &DirectoryHandle,
        name: &str,
        options: FileOpenOptions,
    ) -> Result<FileHandle, FsError> {
        let path = dir.child(name);
        let mut files = self.files.lock().unwrap();
        if files.contains(&path) {
            if options.create && options.exclusive {
                return Err(FsError::AlreadyExists {
                    path: path.display().to_string(),
                });
            }
            return Ok(FileHandle::new(path));
        }
        if !options.create {
            return Err(FsError::NotFound {
                path: path.display().to_string(),
            });
        }
        files.insert(path.clone());
        Ok(FileHandle::new(path))
    }

    async fn remove_file(&self, file: &FileHandle) -> Result<(), FsError> {
        let gate = self.removal_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.files.lock().unwrap().remove(file.path()) {
            self.removals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        } else {
            Err(FsError::NotFound {
                path: file.path().display().to_string(),
            })
        }
    }

    fn resolve_url(&self, file: &FileHandle) -> String {
        format!("memfs://{}", file.path().display())
    }
}

// ── Transport ──────────────────────────────────────────────────────

/// Scripted behaviour for one remote URI.
#[derive(Clone)]
pub enum Script {
    /// Report each `(loaded, total)` tick, then succeed.
    Succeed(Vec<(u64, u64)>),
    /// Fail the first `failures` attempts with `error`, then succeed.
    FailFirst {
        failures: usize,
        error: TransportError,
    },
    /// Never complete and never report progress.
    Hang,
    /// Wait for the gate to open, then succeed.
    Gate(Arc<Notify>),
}

impl Default for Script {
    fn default() -> Self {
        Self::Succeed(Vec::new())
    }
}

/// Transport that follows per-URI scripts and counts attempts.
#[derive(Default)]
pub struct FakeTransport {
    scripts: Mutex<HashMap<String, Script>>,
    attempts: Mutex<HashMap<String, usize>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, uri: &str, script: Script) {
        self.scripts.lock().unwrap().insert(uri.to_string(), script);
    }

    /// A gate that holds the transfer of `uri` until opened.
    pub fn gate(&self, uri: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script(uri, Script::Gate(Arc::clone(&gate)));
        gate
    }

    pub fn attempts(&self, uri: &str) -> usize {
        self.attempts.lock().unwrap().get(uri).copied().unwrap_or(0)
    }
}

#[async_trait]
impl TransportPort for FakeTransport {
    async fn download(
        &self,
        remote_uri: &str,
        _destination: &FileHandle,
        progress: ProgressFn<'_>,
    ) -> Result<(), TransportError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(remote_uri.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(remote_uri)
            .cloned()
            .unwrap_or_default();

        match script {
            Script::Succeed(ticks) => {
                for (loaded, total) in ticks {
                    progress(loaded, total);
                    tokio::task::yield_now().await;
                }
                Ok(())
            }
            Script::FailFirst { failures, error } => {
                if attempt <= failures {
                    Err(error)
                } else {
                    Ok(())
                }
            }
            Script::Hang => std::future::pending().await,
            Script::Gate(gate) => {
                gate.notified().await;
                Ok(())
            }
        }
    }
}

// ── Harness ────────────────────────────────────────────────────────

/// A running cache plus handles on its fakes and event stream.
pub struct Harness {
    pub cache: Arc<BundleCache>,
    pub store: Arc<MemoryStore>,
    pub fs: Arc<FakeFileSystem>,
    pub transport: Arc<FakeTransport>,
    pub events: mpsc::UnboundedReceiver<BundleEvent>,
}

pub fn config() -> BundleCacheConfig {
    BundleCacheConfig::new(BASE_DIR)
        .with_retry_interval(Duration::from_secs(1))
        .with_transfer_timeout(Duration::from_secs(5))
}

pub async fn start() -> Harness {
    start_with(
        config(),
        Arc::new(MemoryStore::new()),
        Arc::new(FakeFileSystem::new()),
        Arc::new(FakeTransport::new()),
    )
    .await
}

pub async fn start_with(
    config: BundleCacheConfig,
    store: Arc<MemoryStore>,
    fs: Arc<FakeFileSystem>,
    transport: Arc<FakeTransport>,
) -> Harness {
    init_tracing();
    let deps = BundleCacheDeps {
        store: store.clone(),
        file_system: fs.clone(),
        transport: transport.clone(),
    };
    let (listener, events) = ChannelListener::new();
    let listener: Arc<dyn BundleEventListener> = Arc::new(listener);
    let cache = BundleCache::initialize_with_listeners(config, deps, vec![listener])
        .await
        .expect("initialize bundle cache");
    Harness {
        cache,
        store,
        fs,
        transport,
        events,
    }
}

// ── Event helpers ──────────────────────────────────────────────────

const EVENT_WAIT: Duration = Duration::from_secs(60);

/// Next delivered event, panicking if none arrives in time.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<BundleEvent>) -> BundleEvent {
    tokio::time::timeout(EVENT_WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Collect events up to and including the first one matching `done`.
pub async fn collect_until(
    rx: &mut mpsc::UnboundedReceiver<BundleEvent>,
    done: impl Fn(&BundleEvent) -> bool,
) -> Vec<BundleEvent> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(rx).await;
        let finished = done(&event);
        seen.push(event);
        if finished {
            return seen;
        }
    }
}

/// Collect events up to and including the next `not_busy`.
pub async fn until_idle(rx: &mut mpsc::UnboundedReceiver<BundleEvent>) -> Vec<BundleEvent> {
    collect_until(rx, |e| *e == BundleEvent::NotBusy).await
}

/// Progress values reported for `name`, in delivery order.
pub fn progress_of(events: &[BundleEvent], name: &str) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            BundleEvent::BundleProgress { name: n, done } if n == name => Some(*done),
            _ => None,
        })
        .collect()
}

/// Events that name `name`.
pub fn events_for<'a>(events: &'a [BundleEvent], name: &str) -> Vec<&'a BundleEvent> {
    events
        .iter()
        .filter(|e| e.bundle_name() == Some(name))
        .collect()
}
