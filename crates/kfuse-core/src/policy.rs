//! Cache policy: when cached objects and bindings may be trusted.

use tracing::debug;

use crate::config::BridgeConfig;
use crate::host::Binding;
use crate::object::FsObject;

/// Decides when the translator must go back to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    root_id: u64,
    relookup_final_segment: bool,
}

impl CachePolicy {
    /// Policy for a tree rooted at `root_id`.
    pub fn new(root_id: u64, relookup_final_segment: bool) -> Self {
        Self {
            root_id,
            relookup_final_segment,
        }
    }

    /// Policy taken from the bridge configuration.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.root_id, config.relookup_final_segment)
    }

    /// Whether `object` needs a proactive attribute refresh.
    ///
    /// Every lookup already refreshes attributes, so only the root, which
    /// is never looked up by name, is refreshed here.
    pub fn needs_revalidation(&self, object: &FsObject) -> bool {
        object.id() == self.root_id
    }

    /// Whether a cached binding can be used without a fresh lookup.
    ///
    /// `more_segments` is true when the path continues past this name. A
    /// negative binding in the middle of a path is always rechecked, since
    /// the daemon may have created the name since.
    pub fn binding_is_valid(&self, binding: &Binding, more_segments: bool) -> bool {
        let valid = if binding.is_negative() && more_segments {
            false
        } else {
            more_segments || !self.relookup_final_segment
        };
        debug!(
            negative = binding.is_negative(),
            more_segments, valid, "binding policy"
        );
        valid
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn positive() -> Binding {
        Binding::Positive(Arc::new(FsObject::new(5)))
    }

    #[test]
    fn test_only_root_revalidates() {
        let policy = CachePolicy::default();
        assert!(policy.needs_revalidation(&FsObject::new(1)));
        assert!(!policy.needs_revalidation(&FsObject::new(2)));

        let policy = CachePolicy::new(9, false);
        assert!(policy.needs_revalidation(&FsObject::new(9)));
        assert!(!policy.needs_revalidation(&FsObject::new(1)));
    }

    #[test]
    fn test_default_binding_rules() {
        let policy = CachePolicy::default();
        assert!(policy.binding_is_valid(&positive(), true));
        assert!(policy.binding_is_valid(&positive(), false));
        assert!(policy.binding_is_valid(&Binding::Negative, false));
        assert!(!policy.binding_is_valid(&Binding::Negative, true));
    }

    #[test]
    fn test_relookup_final_segment() {
        let policy = CachePolicy::new(1, true);
        assert!(policy.binding_is_valid(&positive(), true));
        assert!(!policy.binding_is_valid(&positive(), false));
        assert!(!policy.binding_is_valid(&Binding::Negative, false));
        assert!(!policy.binding_is_valid(&Binding::Negative, true));
    }
}
