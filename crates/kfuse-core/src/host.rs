//! The host's object cache, as seen by the translator.

use std::sync::Arc;

use crate::object::FsObject;

/// Result of resolving a name in a directory.
#[derive(Debug, Clone)]
pub enum Binding {
    /// The name refers to this object.
    Positive(Arc<FsObject>),
    /// The daemon confirmed the name does not exist.
    Negative,
}

impl Binding {
    /// Whether the name is known to be absent.
    pub fn is_negative(&self) -> bool {
        matches!(self, Binding::Negative)
    }

    /// The bound object, if positive.
    pub fn object(&self) -> Option<&Arc<FsObject>> {
        match self {
            Binding::Positive(object) => Some(object),
            Binding::Negative => None,
        }
    }

    /// The bound object, or `None` for a negative binding.
    pub fn into_object(self) -> Option<Arc<FsObject>> {
        match self {
            Binding::Positive(object) => Some(object),
            Binding::Negative => None,
        }
    }
}

/// Object-cache collaborator.
///
/// Implementations serialize their own concurrent access; the translator
/// never holds anything returned here across a transport call except
/// `Arc` handles.
pub trait Host: Send + Sync {
    /// Returns the cached object for `id`, creating an unclassified one if
    /// none exists.
    fn allocate_or_reuse(&self, id: u64) -> Arc<FsObject>;

    /// Returns the cached object for `id`, if any.
    fn object(&self, id: u64) -> Option<Arc<FsObject>>;

    /// Records the result of resolving `name` in `parent`.
    fn bind(&self, parent: u64, name: &[u8], binding: Binding);

    /// Cached result of resolving `name` in `parent`.
    fn binding(&self, parent: u64, name: &[u8]) -> Option<Binding>;

    /// Forgets any cached result for `name` in `parent`.
    fn invalidate_binding(&self, parent: u64, name: &[u8]);

    /// Hands a special object's device id to the host's device machinery.
    fn register_special(&self, object: &FsObject, rdev: u32);
}
