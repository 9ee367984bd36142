//! Load orchestrator.
//!
//! Walks a bundle's files in order. A file already present in the cache
//! directory is reused; anything else is downloaded into a fresh placeholder
//! while the task's cancellation token and an inactivity timer are raced
//! against the transfer. Any failure aborts the whole bundle, deletes the
//! partial file, and leaves the task to the scheduler's retry policy.

use tokio::sync::watch;
use tokio::time::Instant;

use bundlecache_core::{BundleEvent, FileHandle, FileOpenOptions, LoadError, local_file_name};

use crate::progress::{ProgressTracker, ProgressUpdate};
use crate::queue::{TaskOutcome, TaskRun};

use super::BundleCache;

impl BundleCache {
    /// Run one Load attempt.
    pub(super) async fn run_load(&self, run: &TaskRun) -> TaskOutcome {
        if run.cancel.is_cancelled() {
            return TaskOutcome::Cancelled;
        }
        let Some(bundle) = self.lock_state().registry.get(&run.bundle_name) else {
            tracing::debug!(
                target: "bundlecache.loader",
                bundle = %run.bundle_name,
                "Bundle no longer registered, nothing to load"
            );
            return TaskOutcome::Succeeded;
        };

        self.emit_for_task(&run.cancel, BundleEvent::loading(&bundle.name));

        let weights = bundle.file_weights();
        let mut tracker = ProgressTracker::new(&weights);
        for (remote, weight) in bundle.files.iter().zip(weights) {
            if run.cancel.is_cancelled() {
                return TaskOutcome::Cancelled;
            }
            match self.load_file(run, remote, weight, &mut tracker).await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => return TaskOutcome::Cancelled,
                Err(e) => {
                    let retry = e.is_retryable();
                    let message = e.user_message();
                    tracing::warn!(
                        target: "bundlecache.loader",
                        bundle = %bundle.name,
                        remote = %remote,
                        error = %e,
                        retry,
                        "Bundle load failed"
                    );
                    // Transient failures are reported once per task, not on
                    // every retry pass
                    if !retry || run.failures == 0 {
                        self.emit_for_task(
                            &run.cancel,
                            BundleEvent::error(&bundle.name, &message, retry),
                        );
                    }
                    return TaskOutcome::Failed {
                        error: message,
                        retry,
                    };
                }
            }
        }

        if bundle.files.is_empty() {
            self.report(run, tracker.complete_file(0.0));
        }

        let marked = {
            let mut state = self.lock_state();
            !run.cancel.is_cancelled() && state.registry.set_loaded(&bundle.name, true)
        };
        if !marked {
            return TaskOutcome::Cancelled;
        }
        self.persist().await;
        self.emit_for_task(&run.cancel, BundleEvent::loaded(&bundle.name));
        tracing::info!(
            target: "bundlecache.loader",
            bundle = %bundle.name,
            files = bundle.files.len(),
            "Bundle loaded"
        );
        TaskOutcome::Succeeded
    }

    /// Make one remote file available locally.
    async fn load_file(
        &self,
        run: &TaskRun,
        remote: &str,
        weight: f64,
        tracker: &mut ProgressTracker,
    ) -> Result<(), LoadError> {
        let name = local_file_name(remote);

        match self
            .file_system
            .get_file(&self.directory, &name, FileOpenOptions::existing())
            .await
        {
            Ok(handle) => {
                tracing::debug!(target: "bundlecache.loader", remote, file = %name, "Already cached");
                self.record_local(remote, &handle);
                self.report(run, tracker.complete_file(weight));
                return Ok(());
            }
            Err(e) if e.is_not_found() => {}
            Err(source) => return Err(LoadError::file_system(name, source)),
        }

        if run.cancel.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        let handle = self
            .file_system
            .get_file(&self.directory, &name, FileOpenOptions::create())
            .await
            .map_err(|source| LoadError::file_system(&name, source))?;

        tracing::debug!(target: "bundlecache.loader", remote, file = %name, "Downloading");
        match self.transfer(run, remote, &handle, weight, tracker).await {
            Ok(()) => {
                self.record_local(remote, &handle);
                self.report(run, tracker.complete_file(weight));
                Ok(())
            }
            Err(e) => {
                self.discard_partial(&handle).await;
                Err(e)
            }
        }
    }

    /// Drive the transport, racing it against cancellation and inactivity.
    ///
    /// The inactivity deadline is pushed back on every progress report.
    async fn transfer(
        &self,
        run: &TaskRun,
        remote: &str,
        handle: &FileHandle,
        weight: f64,
        tracker: &mut ProgressTracker,
    ) -> Result<(), LoadError> {
        let timeout = self.config.transfer_timeout();
        let (progress_tx, mut progress_rx) = watch::channel(ProgressUpdate::default());
        let on_progress = move |loaded: u64, total: u64| {
            progress_tx.send_modify(|state| {
                state.loaded = loaded;
                state.total = total;
                state.seq += 1;
            });
        };

        let download = self.transport.download(remote, handle, &on_progress);
        tokio::pin!(download);
        let stall = tokio::time::sleep(timeout);
        tokio::pin!(stall);

        loop {
            tokio::select! {
                biased;

                () = run.cancel.cancelled() => return Err(LoadError::Cancelled),

                result = &mut download => {
                    return result.map_err(|e| LoadError::transport(remote, e));
                }

                Ok(()) = progress_rx.changed() => {
                    stall.as_mut().reset(Instant::now() + timeout);
                    let update = *progress_rx.borrow_and_update();
                    self.report(run, tracker.partial(weight, update));
                }

                () = &mut stall => {
                    return Err(LoadError::Timeout {
                        uri: remote.to_string(),
                        millis: self.config.transfer_timeout_ms.max(1),
                    });
                }
            }
        }
    }

    fn report(&self, run: &TaskRun, done: Option<f64>) {
        if let Some(done) = done {
            self.emit_for_task(&run.cancel, BundleEvent::progress(&run.bundle_name, done));
        }
    }

    fn record_local(&self, remote: &str, handle: &FileHandle) {
        let url = self.file_system.resolve_url(handle);
        self.lock_state().local_urls.insert(remote.to_string(), url);
    }

    async fn discard_partial(&self, handle: &FileHandle) {
        match self.file_system.remove_file(handle).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!(
                target: "bundlecache.loader",
                path = %handle.path().display(),
                error = %e,
                "Failed to delete partial file"
            ),
        }
    }
}
