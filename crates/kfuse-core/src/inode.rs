//! Object cache for the bridge.
//!
//! [`ObjectCache`] is the default [`Host`]: a concurrent table of objects
//! keyed by daemon id, plus a table of name bindings keyed by
//! `(parent id, name)`. Both use `DashMap` so lookups on different
//! directories never contend.
//!
//! Entries live for the whole session unless the host calls
//! [`ObjectCache::forget`] or [`ObjectCache::purge_negative`].

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::host::{Binding, Host};
use crate::object::FsObject;

/// Thread-safe object and binding table.
#[derive(Debug, Default)]
pub struct ObjectCache {
    objects: DashMap<u64, Arc<FsObject>>,
    bindings: DashMap<(u64, Vec<u8>), Binding>,
    specials: DashMap<u64, u32>,
}

impl ObjectCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if no objects are cached.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of cached bindings, positive and negative.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Device id registered for a special object.
    pub fn special_device(&self, id: u64) -> Option<u32> {
        self.specials.get(&id).map(|entry| *entry)
    }

    /// Evicts object `id` along with every binding that names it or sits
    /// under it. Handles already holding the object keep it alive.
    ///
    /// Returns true if the object was cached.
    pub fn forget(&self, id: u64) -> bool {
        let removed = self.objects.remove(&id).is_some();
        self.specials.remove(&id);
        self.bindings.retain(|(parent, _), binding| {
            *parent != id && binding.object().is_none_or(|object| object.id() != id)
        });
        if removed {
            trace!(object = id, "object forgotten");
        }
        removed
    }

    /// Drops every negative binding and returns how many went.
    pub fn purge_negative(&self) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|_, binding| !binding.is_negative());
        let purged = before.saturating_sub(self.bindings.len());
        trace!(purged, "negative bindings purged");
        purged
    }
}

impl Host for ObjectCache {
    fn allocate_or_reuse(&self, id: u64) -> Arc<FsObject> {
        Arc::clone(
            self.objects
                .entry(id)
                .or_insert_with(|| Arc::new(FsObject::new(id)))
                .value(),
        )
    }

    fn object(&self, id: u64) -> Option<Arc<FsObject>> {
        self.objects.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn bind(&self, parent: u64, name: &[u8], binding: Binding) {
        self.bindings.insert((parent, name.to_vec()), binding);
    }

    fn binding(&self, parent: u64, name: &[u8]) -> Option<Binding> {
        self.bindings
            .get(&(parent, name.to_vec()))
            .map(|entry| entry.value().clone())
    }

    fn invalidate_binding(&self, parent: u64, name: &[u8]) {
        if self.bindings.remove(&(parent, name.to_vec())).is_some() {
            trace!(parent, name = %name.escape_ascii(), "binding invalidated");
        }
    }

    fn register_special(&self, object: &FsObject, rdev: u32) {
        self.specials.insert(object.id(), rdev);
    }
}
