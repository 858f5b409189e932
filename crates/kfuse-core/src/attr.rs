//! Attribute synchronizer: applies wire attribute records to cached objects.

use kfuse_proto::WireAttr;
use tracing::warn;

use crate::host::Host;
use crate::object::FsObject;
use crate::ops::{ObjectClass, OperationSet};

/// Overwrites every attribute of `object` with `attr`. Identity is untouched.
pub fn apply_attributes(object: &FsObject, attr: &WireAttr) {
    object.overwrite_attrs(attr);
}

/// Applies `attr`, then classifies `object` if this is its first record.
///
/// The class is permanent. A later record whose type disagrees still
/// refreshes the attributes but leaves the operation set alone. Special
/// objects register their device id with the host on first
/// classification.
pub fn initialize_object<H: Host + ?Sized>(
    host: &H,
    object: &FsObject,
    attr: &WireAttr,
) -> &'static OperationSet {
    apply_attributes(object, attr);

    let class = ObjectClass::from_kind(attr.kind());
    if let Some(existing) = object.ops() {
        if existing.class() != class {
            warn!(
                object = object.id(),
                current = existing.name(),
                reported = ?class,
                "daemon reported a different type for a live object; keeping its class"
            );
        }
        return existing;
    }

    let (ops, installed) = object.classify(OperationSet::for_class(class));
    if installed && class == ObjectClass::Special {
        object.set_rdev(attr.rdev);
        host.register_special(object, attr.rdev);
    }
    ops
}
