//! In-memory bundle registry.
//!
//! The registry is a plain synchronous map with no locking and no I/O. The
//! owner (`BundleCache`) serializes access and decides when to persist; the
//! registry only knows how to turn itself into bytes and back.

use indexmap::IndexMap;

use super::types::{Bundle, BundleRecord, NewBundle};

/// Bundle map keyed by name, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleRegistry {
    bundles: IndexMap<String, BundleRecord>,
}

impl BundleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a registry from its persisted form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let bundles: IndexMap<String, BundleRecord> = serde_json::from_slice(bytes)?;
        tracing::debug!(
            target: "bundlecache.registry",
            count = bundles.len(),
            "Restored bundle registry"
        );
        Ok(Self { bundles })
    }

    /// Serialize the full registry for persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.bundles)
    }

    /// Number of registered bundles.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether no bundles are registered.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Insert a new bundle with `loaded = false`.
    ///
    /// Returns `false` (and leaves the registry untouched) if the name is
    /// already registered.
    pub fn insert(&mut self, bundle: NewBundle) -> bool {
        if self.bundles.contains_key(&bundle.name) {
            return false;
        }
        let name = bundle.name.clone();
        self.bundles.insert(name, BundleRecord::from(bundle));
        true
    }

    /// Remove a bundle, returning a snapshot of what was removed.
    pub fn remove(&mut self, name: &str) -> Option<Bundle> {
        self.bundles
            .shift_remove(name)
            .map(|record| record.to_bundle(name))
    }

    /// Copy of a registered bundle.
    pub fn get(&self, name: &str) -> Option<Bundle> {
        self.bundles.get(name).map(|record| record.to_bundle(name))
    }

    /// Whether a bundle with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    /// Whether the named bundle is registered and fully loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.bundles.get(name).is_some_and(|record| record.loaded)
    }

    /// Set the `loaded` flag. Returns `false` if the bundle is unknown.
    pub fn set_loaded(&mut self, name: &str, loaded: bool) -> bool {
        match self.bundles.get_mut(name) {
            Some(record) => {
                record.loaded = loaded;
                true
            }
            None => false,
        }
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.bundles.keys().cloned().collect()
    }

    /// Copies of all registered bundles, in registration order.
    pub fn bundles(&self) -> Vec<Bundle> {
        self.bundles
            .iter()
            .map(|(name, record)| record.to_bundle(name))
            .collect()
    }

    /// Whether any registered bundle still lists the given remote file.
    pub fn is_referenced(&self, remote: &str) -> bool {
        self.bundles
            .values()
            .any(|record| record.files.iter().any(|f| f == remote))
    }
}
