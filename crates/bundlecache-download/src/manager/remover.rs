//! Remove orchestrator.
//!
//! Deletes the cached files of a removed bundle, skipping every file that a
//! still-registered bundle lists. The reference check reads the live
//! registry at the moment each file is considered, so a bundle re-added
//! while the Remove waits keeps its files.

use bundlecache_core::{FileOpenOptions, local_file_name};

use crate::queue::{TaskOutcome, TaskRun};

use super::BundleCache;

impl BundleCache {
    /// Run one Remove task. Never fails; filesystem errors are logged.
    pub(super) async fn run_remove(&self, run: &TaskRun) -> TaskOutcome {
        let Some(snapshot) = run.snapshot.as_ref() else {
            tracing::warn!(
                target: "bundlecache.remover",
                bundle = %run.bundle_name,
                "Remove task has no bundle snapshot"
            );
            return TaskOutcome::Succeeded;
        };

        let mut deleted = 0usize;
        let mut shared = 0usize;
        for remote in &snapshot.files {
            if run.cancel.is_cancelled() {
                return TaskOutcome::Cancelled;
            }
            if self.lock_state().registry.is_referenced(remote) {
                shared += 1;
                continue;
            }

            let name = local_file_name(remote);
            match self
                .file_system
                .get_file(&self.directory, &name, FileOpenOptions::existing())
                .await
            {
                Ok(handle) => match self.file_system.remove_file(&handle).await {
                    Ok(()) => deleted += 1,
                    Err(e) => tracing::debug!(
                        target: "bundlecache.remover",
                        file = %name,
                        error = %e,
                        "Could not delete cached file"
                    ),
                },
                Err(e) if e.is_not_found() => {}
                Err(e) => tracing::debug!(
                    target: "bundlecache.remover",
                    file = %name,
                    error = %e,
                    "Could not open cached file"
                ),
            }

            self.lock_state().local_urls.remove(remote);
        }

        tracing::info!(
            target: "bundlecache.remover",
            bundle = %run.bundle_name,
            deleted,
            shared,
            "Bundle files removed"
        );
        TaskOutcome::Succeeded
    }
}
