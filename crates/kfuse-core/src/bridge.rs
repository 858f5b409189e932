//! Path-operation translator.
//!
//! Each entry point builds one request, blocks on the transport for its
//! reply, and then updates the object cache, returns decoded data, or
//! returns a bare status. Nothing is locked across the transport call.

use std::sync::Arc;

use bytes::Bytes;
use kfuse_proto::attr::{S_IFMT, S_IFREG};
use kfuse_proto::{
    AttrOut, EntryOut, FileKind, GetdirOut, Opcode, Outcome, ProtocolError, Request, WireStruct,
};
use tracing::{debug, trace, warn};

use crate::attr::{apply_attributes, initialize_object};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::handles::DirHandle;
use crate::host::{Binding, Host};
use crate::inode::ObjectCache;
use crate::object::{FsObject, ObjectAttrs};
use crate::ops::Capabilities;
use crate::policy::CachePolicy;
use crate::stats::BridgeStats;
use crate::transport::Transport;

/// The kernel half of the filesystem bridge.
pub struct Bridge<T, H = ObjectCache> {
    transport: T,
    host: H,
    config: BridgeConfig,
    policy: CachePolicy,
    stats: Arc<BridgeStats>,
}

impl<T: Transport> Bridge<T> {
    /// Creates a bridge with a fresh [`ObjectCache`].
    pub fn new(transport: T, config: BridgeConfig) -> Self {
        Self::with_host(transport, ObjectCache::new(), config)
    }
}

impl<T: Transport, H: Host> Bridge<T, H> {
    /// Creates a bridge over an existing host cache.
    pub fn with_host(transport: T, host: H, config: BridgeConfig) -> Self {
        let policy = CachePolicy::from_config(&config);
        Self {
            transport,
            host,
            config,
            policy,
            stats: BridgeStats::new(),
        }
    }

    /// The transport requests go through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The host holding objects and bindings.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Configuration this bridge was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Binding trust policy.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Counters shared with every handle this bridge opens.
    pub fn stats(&self) -> &Arc<BridgeStats> {
        &self.stats
    }

    /// Sends `request` and returns the body of a successful reply.
    fn dispatch(&self, request: &Request) -> BridgeResult<Bytes> {
        let opcode = request.opcode();
        let shape = opcode.reply_shape(self.config.readlink_capacity());
        self.stats.record_request();

        let reply = self.transport.send(request, shape)?;
        match reply.into_outcome(shape) {
            Ok(Outcome::Success(body)) => Ok(body),
            Ok(Outcome::Failure(errno)) => {
                self.stats.record_daemon_error();
                trace!(opcode = %opcode, subject = request.subject(), errno, "daemon error");
                Err(BridgeError::Daemon(errno))
            }
            Err(e) => Err(self.protocol_violation(opcode, request.subject(), e)),
        }
    }

    fn protocol_violation(&self, opcode: Opcode, subject: u64, e: ProtocolError) -> BridgeError {
        self.stats.record_protocol_violation();
        warn!(opcode = %opcode, subject, error = %e, "protocol violation");
        BridgeError::Protocol(e)
    }

    fn decode<S: WireStruct>(&self, request: &Request, body: &[u8]) -> BridgeResult<S> {
        S::decode(body).map_err(|e| self.protocol_violation(request.opcode(), request.subject(), e))
    }

    fn require_directory(object: &FsObject) -> BridgeResult<()> {
        if object.supports(Capabilities::DIRECTORY_OPS) {
            Ok(())
        } else {
            Err(BridgeError::NotADirectory(object.id()))
        }
    }

    /// Installs an entry reply as a positive binding for `name` in `parent`.
    fn install_entry(&self, parent: u64, name: &[u8], entry: &EntryOut) -> Arc<FsObject> {
        let object = self.host.allocate_or_reuse(entry.id);
        let ops = initialize_object(&self.host, &object, &entry.attr);
        self.host
            .bind(parent, name, Binding::Positive(Arc::clone(&object)));
        trace!(parent, object = entry.id, class = ops.name(), "bound");
        object
    }

    /// Resolves `name` in `parent`.
    ///
    /// A not-found reply is a successful negative binding, not an error.
    pub fn lookup(&self, parent: &FsObject, name: &[u8]) -> BridgeResult<Binding> {
        trace!(parent = parent.id(), name = %name.escape_ascii(), "lookup");
        Self::require_directory(parent)?;
        let request = Request::lookup(parent.id(), name)?;

        match self.dispatch(&request) {
            Ok(body) => {
                let entry: EntryOut = self.decode(&request, &body)?;
                Ok(Binding::Positive(self.install_entry(parent.id(), name, &entry)))
            }
            Err(e) if e.is_not_found() => {
                self.stats.record_negative_binding();
                self.host.bind(parent.id(), name, Binding::Negative);
                Ok(Binding::Negative)
            }
            Err(e) => Err(e),
        }
    }

    /// Creates a node and binds it in one round trip.
    pub fn mknod(
        &self,
        parent: &FsObject,
        name: &[u8],
        mode: u32,
        rdev: u32,
    ) -> BridgeResult<Arc<FsObject>> {
        trace!(parent = parent.id(), name = %name.escape_ascii(), mode, rdev, "mknod");
        Self::require_directory(parent)?;
        let request = Request::mknod(parent.id(), mode, rdev, name)?;
        let body = self.dispatch(&request)?;
        let entry: EntryOut = self.decode(&request, &body)?;
        Ok(self.install_entry(parent.id(), name, &entry))
    }

    /// Creates a regular file. The type bits of `mode` are replaced.
    pub fn create(&self, parent: &FsObject, name: &[u8], mode: u32) -> BridgeResult<Arc<FsObject>> {
        self.mknod(parent, name, (mode & !S_IFMT) | S_IFREG, 0)
    }

    /// Creates a directory. The new name is left unbound; a later lookup
    /// populates it.
    pub fn mkdir(&self, parent: &FsObject, name: &[u8], mode: u32) -> BridgeResult<()> {
        trace!(parent = parent.id(), name = %name.escape_ascii(), mode, "mkdir");
        Self::require_directory(parent)?;
        let request = Request::mkdir(parent.id(), mode, name)?;
        self.dispatch(&request)?;
        self.host.invalidate_binding(parent.id(), name);
        Ok(())
    }

    /// Creates a symlink. Like [`mkdir`](Self::mkdir), nothing is bound.
    pub fn symlink(&self, parent: &FsObject, name: &[u8], target: &[u8]) -> BridgeResult<()> {
        trace!(
            parent = parent.id(),
            name = %name.escape_ascii(),
            target = %target.escape_ascii(),
            "symlink"
        );
        Self::require_directory(parent)?;
        let request = Request::symlink(parent.id(), name, target)?;
        self.dispatch(&request)?;
        self.host.invalidate_binding(parent.id(), name);
        Ok(())
    }

    /// Removes the non-directory `name` from `parent` and drops its binding.
    pub fn unlink(&self, parent: &FsObject, name: &[u8]) -> BridgeResult<()> {
        trace!(parent = parent.id(), name = %name.escape_ascii(), "unlink");
        self.remove(Opcode::Unlink, parent, name)
    }

    /// Removes the empty directory `name` from `parent` and drops its binding.
    pub fn rmdir(&self, parent: &FsObject, name: &[u8]) -> BridgeResult<()> {
        trace!(parent = parent.id(), name = %name.escape_ascii(), "rmdir");
        self.remove(Opcode::Rmdir, parent, name)
    }

    fn remove(&self, opcode: Opcode, parent: &FsObject, name: &[u8]) -> BridgeResult<()> {
        Self::require_directory(parent)?;
        let request = Request::name_only(opcode, parent.id(), name)?;
        self.dispatch(&request)?;
        self.host.invalidate_binding(parent.id(), name);
        Ok(())
    }

    /// Moves `old_name` in `old_parent` to `new_name` in `new_parent`.
    pub fn rename(
        &self,
        old_parent: &FsObject,
        old_name: &[u8],
        new_parent: &FsObject,
        new_name: &[u8],
    ) -> BridgeResult<()> {
        trace!(
            old_parent = old_parent.id(),
            old_name = %old_name.escape_ascii(),
            new_parent = new_parent.id(),
            new_name = %new_name.escape_ascii(),
            "rename"
        );
        Self::require_directory(old_parent)?;
        Self::require_directory(new_parent)?;
        let request = Request::rename(old_parent.id(), new_parent.id(), old_name, new_name)?;
        self.dispatch(&request)?;
        self.host.invalidate_binding(old_parent.id(), old_name);
        self.host.invalidate_binding(new_parent.id(), new_name);
        Ok(())
    }

    /// Adds `new_name` in `new_parent` as another name for `object`.
    pub fn link(&self, object: &FsObject, new_parent: &FsObject, new_name: &[u8]) -> BridgeResult<()> {
        trace!(
            object = object.id(),
            new_parent = new_parent.id(),
            new_name = %new_name.escape_ascii(),
            "link"
        );
        Self::require_directory(new_parent)?;
        let request = Request::link(object.id(), new_parent.id(), new_name)?;
        self.dispatch(&request)?;
        self.host.invalidate_binding(new_parent.id(), new_name);
        Ok(())
    }

    /// Fetches a symlink target into a page-sized, NUL-terminated buffer.
    fn read_link(&self, object: &FsObject) -> BridgeResult<Vec<u8>> {
        if !object.supports(Capabilities::READLINK) {
            return Err(BridgeError::NotASymlink(object.id()));
        }
        let page = self.config.page_size;
        let mut link = Vec::new();
        link.try_reserve_exact(page)
            .map_err(|_| BridgeError::OutOfMemory(page))?;

        let request = Request::attribute_query(Opcode::Readlink, object.id())?;
        let body = self.dispatch(&request)?;
        link.extend_from_slice(&body);
        link.push(0);
        Ok(link)
    }

    /// The target of a symlink, up to its first NUL.
    pub fn readlink(&self, object: &FsObject) -> BridgeResult<Vec<u8>> {
        trace!(object = object.id(), "readlink");
        let mut link = self.read_link(object)?;
        let end = link.iter().position(|&b| b == 0).unwrap_or(link.len());
        link.truncate(end);
        Ok(link)
    }

    /// Copies at most `buf.len()` bytes of the target into `buf`.
    pub fn readlink_into(&self, object: &FsObject, buf: &mut [u8]) -> BridgeResult<usize> {
        let target = self.readlink(object)?;
        let n = target.len().min(buf.len());
        buf[..n].copy_from_slice(&target[..n]);
        Ok(n)
    }

    /// The target to continue path resolution with.
    pub fn follow_link(&self, object: &FsObject) -> BridgeResult<Vec<u8>> {
        trace!(object = object.id(), "follow_link");
        if !object.supports(Capabilities::FOLLOW_LINK) {
            return Err(BridgeError::NotASymlink(object.id()));
        }
        self.readlink(object)
    }

    /// Opens the listing of a directory.
    ///
    /// `flags` are the host open flags and must include `O_DIRECTORY`. The
    /// daemon's container must be a regular file; anything else is a
    /// protocol violation and the container is dropped.
    pub fn open_dir(&self, object: &FsObject, flags: i32) -> BridgeResult<DirHandle> {
        trace!(object = object.id(), flags, "opendir");
        if flags & libc::O_DIRECTORY == 0 {
            return Err(BridgeError::IsADirectory(object.id()));
        }
        if !object.supports(Capabilities::OPEN_DIR) {
            return Err(BridgeError::NotADirectory(object.id()));
        }

        let request = Request::attribute_query(Opcode::Getdir, object.id())?;
        let body = self.dispatch(&request)?;
        let out: GetdirOut = self.decode(&request, &body)?;
        if out.container == 0 {
            return Err(self.protocol_violation(
                Opcode::Getdir,
                object.id(),
                ProtocolError::MissingContainer,
            ));
        }
        let Some(container) = self.transport.claim_container(out.container) else {
            return Err(self.protocol_violation(
                Opcode::Getdir,
                object.id(),
                ProtocolError::MissingContainer,
            ));
        };
        let kind = container.kind();
        if kind != Some(FileKind::RegularFile) {
            drop(container);
            return Err(self.protocol_violation(
                Opcode::Getdir,
                object.id(),
                ProtocolError::ContainerNotRegular(kind),
            ));
        }

        self.stats.record_dir_open();
        Ok(
            DirHandle::new(object.id(), container, self.config.dir_read_chunk)
                .with_stats(Arc::clone(&self.stats)),
        )
    }

    /// Releases a directory handle and its container.
    pub fn release_dir(&self, handle: DirHandle) {
        handle.release();
        self.stats.record_dir_release();
    }

    /// Refreshes the attributes of `object` from the daemon.
    pub fn getattr(&self, object: &FsObject) -> BridgeResult<ObjectAttrs> {
        trace!(object = object.id(), "getattr");
        let request = Request::attribute_query(Opcode::Getattr, object.id())?;
        let body = self.dispatch(&request)?;
        let out: AttrOut = self.decode(&request, &body)?;
        apply_attributes(object, &out.attr);
        Ok(object.attrs())
    }

    /// Refreshes `object` if the cache policy says it may be stale.
    pub fn revalidate(&self, object: &FsObject) -> BridgeResult<()> {
        if self.policy.needs_revalidation(object) {
            debug!(object = object.id(), "revalidating");
            self.getattr(object)?;
        }
        Ok(())
    }

    /// Access check. Always allowed; policy lives in the host.
    pub fn permission(&self, object: &FsObject, mask: i32) -> BridgeResult<()> {
        match object.ops() {
            Some(ops) => ops.permission(object, mask),
            None => Ok(()),
        }
    }

    /// Loads the root object and classifies it.
    pub fn root(&self) -> BridgeResult<Arc<FsObject>> {
        let id = self.config.root_id;
        trace!(object = id, "root");
        let request = Request::attribute_query(Opcode::Getattr, id)?;
        let body = self.dispatch(&request)?;
        let out: AttrOut = self.decode(&request, &body)?;
        let object = self.host.allocate_or_reuse(id);
        initialize_object(&self.host, &object, &out.attr);
        Ok(object)
    }

    /// Resolves one path segment, using the cached binding when the policy
    /// trusts it.
    pub fn resolve(
        &self,
        parent: &FsObject,
        name: &[u8],
        more_segments: bool,
    ) -> BridgeResult<Binding> {
        if let Some(binding) = self.host.binding(parent.id(), name)
            && self.policy.binding_is_valid(&binding, more_segments)
        {
            return Ok(binding);
        }
        self.lookup(parent, name)
    }

    /// Resolves a slash-separated path from the root.
    ///
    /// Empty segments and `.` are skipped. Symlinks are returned, not
    /// followed. A missing segment fails with ENOENT.
    pub fn walk(&self, path: &[u8]) -> BridgeResult<Arc<FsObject>> {
        trace!(path = %path.escape_ascii(), "walk");
        let mut current = match self.host.object(self.config.root_id) {
            Some(root) if root.is_initialized() => {
                self.revalidate(&root)?;
                root
            }
            _ => self.root()?,
        };

        let segments: Vec<&[u8]> = path
            .split(|&b| b == b'/')
            .filter(|s| !s.is_empty() && *s != b".")
            .collect();
        for (i, segment) in segments.iter().enumerate() {
            let more = i + 1 < segments.len();
            current = self
                .resolve(&current, segment, more)?
                .into_object()
                .ok_or(BridgeError::Daemon(libc::ENOENT))?;
        }
        Ok(current)
    }
}
