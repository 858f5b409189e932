//! In-memory daemon speaking the wire protocol.
//!
//! Every request is encoded to a frame and decoded again before it is
//! executed, so tests exercise the codec on the daemon side too. The tree
//! lives behind one mutex; ids are handed out sequentially.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use kfuse_proto::attr::{S_IFDIR, S_IFLNK, S_IFMT};
use kfuse_proto::{
    AttrOut, EntryOut, FileKind, GetdirOut, Opcode, Reply, ReplyShape, Request, RequestBody,
    ROOT_ID, WireAttr, WireStruct,
};
use parking_lot::Mutex;
use tracing::trace;

use crate::transport::{ContainerFile, MemoryContainer, Transport, TransportError};

use super::generators::render_listing;

/// Seconds value of the daemon's clock at startup.
const EPOCH: i64 = 1_700_000_000;

#[derive(Debug)]
enum NodeData {
    Directory(BTreeMap<Vec<u8>, u64>),
    Symlink(Vec<u8>),
    Other,
}

#[derive(Debug)]
struct Node {
    attr: WireAttr,
    data: NodeData,
}

impl Node {
    fn is_dir(&self) -> bool {
        matches!(self.data, NodeData::Directory(_))
    }
}

#[derive(Debug)]
struct DaemonState {
    nodes: HashMap<u64, Node>,
    next_id: u64,
    clock: i64,
    containers: HashMap<u64, Box<dyn ContainerFile>>,
    next_token: u64,
    scripted: HashMap<Opcode, VecDeque<Reply>>,
    opcodes: Vec<Opcode>,
    closed: bool,
}

type Outcome = Result<Bytes, i32>;

impl DaemonState {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn node(&self, id: u64) -> Result<&Node, i32> {
        self.nodes.get(&id).ok_or(libc::ENOENT)
    }

    fn node_mut(&mut self, id: u64) -> Result<&mut Node, i32> {
        self.nodes.get_mut(&id).ok_or(libc::ENOENT)
    }

    fn dir(&self, id: u64) -> Result<&BTreeMap<Vec<u8>, u64>, i32> {
        match &self.node(id)?.data {
            NodeData::Directory(children) => Ok(children),
            _ => Err(libc::ENOTDIR),
        }
    }

    fn dir_mut(&mut self, id: u64) -> Result<&mut BTreeMap<Vec<u8>, u64>, i32> {
        match &mut self.node_mut(id)?.data {
            NodeData::Directory(children) => Ok(children),
            _ => Err(libc::ENOTDIR),
        }
    }

    fn child(&self, parent: u64, name: &[u8]) -> Result<u64, i32> {
        self.dir(parent)?.get(name).copied().ok_or(libc::ENOENT)
    }

    fn touch(&mut self, id: u64) {
        let now = self.tick();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attr.mtime = now;
            node.attr.ctime = now;
        }
    }

    fn adjust_nlink(&mut self, id: u64, delta: i32) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attr.nlink = node.attr.nlink.saturating_add_signed(delta);
            if node.attr.nlink == 0 {
                self.nodes.remove(&id);
            }
        }
    }

    fn insert_node(&mut self, mode: u32, rdev: u32, size: u64, data: NodeData) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let now = self.tick();
        let nlink = if matches!(data, NodeData::Directory(_)) { 2 } else { 1 };
        self.nodes.insert(
            id,
            Node {
                attr: WireAttr {
                    mode,
                    nlink,
                    uid: 0,
                    gid: 0,
                    rdev,
                    blksize: 4096,
                    size,
                    blocks: size.div_ceil(512),
                    atime: now,
                    mtime: now,
                    ctime: now,
                },
                data,
            },
        );
        id
    }

    /// Adds a new child under `parent`. Fails if the name is taken.
    fn add_child(
        &mut self,
        parent: u64,
        name: &[u8],
        mode: u32,
        rdev: u32,
        size: u64,
        data: NodeData,
    ) -> Result<u64, i32> {
        if self.dir(parent)?.contains_key(name) {
            return Err(libc::EEXIST);
        }
        let is_dir = matches!(data, NodeData::Directory(_));
        let id = self.insert_node(mode, rdev, size, data);
        self.dir_mut(parent)?.insert(name.to_vec(), id);
        if is_dir {
            self.adjust_nlink(parent, 1);
        }
        self.touch(parent);
        Ok(id)
    }

    fn entry_out(&self, id: u64) -> Outcome {
        let attr = self.node(id)?.attr;
        Ok(EntryOut { id, attr }.encode())
    }

    fn execute(&mut self, subject: u64, body: RequestBody<'_>, opcode: Opcode) -> Outcome {
        match (opcode, body) {
            (Opcode::Lookup, RequestBody::Name(name)) => {
                let id = self.child(subject, name)?;
                self.entry_out(id)
            }
            (Opcode::Getattr, RequestBody::Empty) => {
                let attr = self.node(subject)?.attr;
                Ok(AttrOut { attr }.encode())
            }
            (Opcode::Readlink, RequestBody::Empty) => match &self.node(subject)?.data {
                NodeData::Symlink(target) => Ok(Bytes::copy_from_slice(target)),
                _ => Err(libc::EINVAL),
            },
            (Opcode::Getdir, RequestBody::Empty) => {
                let entries: Vec<(u64, Vec<u8>, u32)> = self
                    .dir(subject)?
                    .iter()
                    .map(|(name, &id)| {
                        let kind = self
                            .nodes
                            .get(&id)
                            .and_then(|node| node.attr.kind())
                            .map_or(0, FileKind::dirent_type);
                        (id, name.clone(), kind)
                    })
                    .collect();
                let listing = render_listing(&entries).map_err(|_| libc::ENAMETOOLONG)?;
                let token = self.stage(Box::new(MemoryContainer::new(listing)));
                Ok(GetdirOut { container: token }.encode())
            }
            (Opcode::Mknod, RequestBody::Mknod { mode, rdev, name }) => {
                let data = if mode & S_IFMT == S_IFDIR {
                    NodeData::Directory(BTreeMap::new())
                } else {
                    NodeData::Other
                };
                let id = self.add_child(subject, name, mode, rdev, 0, data)?;
                self.entry_out(id)
            }
            (Opcode::Mkdir, RequestBody::Mkdir { mode, name }) => {
                let mode = (mode & !S_IFMT) | S_IFDIR;
                self.add_child(subject, name, mode, 0, 4096, NodeData::Directory(BTreeMap::new()))?;
                Ok(Bytes::new())
            }
            (Opcode::Symlink, RequestBody::Symlink { name, target }) => {
                let size = target.len() as u64;
                let data = NodeData::Symlink(target.to_vec());
                self.add_child(subject, name, S_IFLNK | 0o777, 0, size, data)?;
                Ok(Bytes::new())
            }
            (Opcode::Unlink, RequestBody::Name(name)) => {
                let id = self.child(subject, name)?;
                if self.node(id)?.is_dir() {
                    return Err(libc::EISDIR);
                }
                self.dir_mut(subject)?.remove(name);
                self.touch(subject);
                self.adjust_nlink(id, -1);
                Ok(Bytes::new())
            }
            (Opcode::Rmdir, RequestBody::Name(name)) => {
                let id = self.child(subject, name)?;
                if !self.dir(id)?.is_empty() {
                    return Err(libc::ENOTEMPTY);
                }
                self.dir_mut(subject)?.remove(name);
                self.nodes.remove(&id);
                self.adjust_nlink(subject, -1);
                self.touch(subject);
                Ok(Bytes::new())
            }
            (
                Opcode::Rename,
                RequestBody::Rename {
                    new_parent,
                    old_name,
                    new_name,
                },
            ) => self.rename(subject, old_name, new_parent, new_name),
            (Opcode::Link, RequestBody::Link { new_parent, name }) => {
                if self.node(subject)?.is_dir() {
                    return Err(libc::EPERM);
                }
                if self.dir(new_parent)?.contains_key(name) {
                    return Err(libc::EEXIST);
                }
                self.dir_mut(new_parent)?.insert(name.to_vec(), subject);
                self.adjust_nlink(subject, 1);
                self.touch(new_parent);
                Ok(Bytes::new())
            }
            _ => Err(libc::EINVAL),
        }
    }

    fn rename(&mut self, parent: u64, old_name: &[u8], new_parent: u64, new_name: &[u8]) -> Outcome {
        let id = self.child(parent, old_name)?;
        let moving_dir = self.node(id)?.is_dir();
        let replaced = self.dir(new_parent)?.get(new_name).copied();

        if let Some(existing) = replaced {
            if existing == id {
                return Ok(Bytes::new());
            }
            match (moving_dir, self.node(existing)?.is_dir()) {
                (true, false) => return Err(libc::ENOTDIR),
                (false, true) => return Err(libc::EISDIR),
                (true, true) if !self.dir(existing)?.is_empty() => return Err(libc::ENOTEMPTY),
                _ => {}
            }
        }

        self.dir_mut(parent)?.remove(old_name);
        self.dir_mut(new_parent)?.insert(new_name.to_vec(), id);
        if let Some(existing) = replaced {
            if self.node(existing)?.is_dir() {
                self.nodes.remove(&existing);
                self.adjust_nlink(new_parent, -1);
            } else {
                self.adjust_nlink(existing, -1);
            }
        }
        if moving_dir && parent != new_parent {
            self.adjust_nlink(parent, -1);
            self.adjust_nlink(new_parent, 1);
        }
        self.touch(parent);
        self.touch(new_parent);
        Ok(Bytes::new())
    }

    fn stage(&mut self, container: Box<dyn ContainerFile>) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.containers.insert(token, container);
        token
    }
}

/// A daemon holding its whole tree in memory.
#[derive(Debug)]
pub struct MemoryDaemon {
    state: Mutex<DaemonState>,
    requests: AtomicU64,
}

impl Default for MemoryDaemon {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDaemon {
    /// A daemon with an empty root directory at id 1. New objects get ids
    /// from 2 upwards.
    pub fn new() -> Self {
        let mut state = DaemonState {
            nodes: HashMap::new(),
            next_id: ROOT_ID,
            clock: EPOCH,
            containers: HashMap::new(),
            next_token: 1,
            scripted: HashMap::new(),
            opcodes: Vec::new(),
            closed: false,
        };
        state.insert_node(S_IFDIR | 0o755, 0, 4096, NodeData::Directory(BTreeMap::new()));
        Self {
            state: Mutex::new(state),
            requests: AtomicU64::new(0),
        }
    }

    /// Sets the id the next created object receives.
    #[must_use]
    pub fn with_next_id(self, id: u64) -> Self {
        self.state.lock().next_id = id;
        self
    }

    /// Requests received so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Opcodes received so far, in order.
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.state.lock().opcodes.clone()
    }

    /// Answers the next `opcode` request with `reply` instead of executing it.
    pub fn script_reply(&self, opcode: Opcode, reply: Reply) {
        self.state
            .lock()
            .scripted
            .entry(opcode)
            .or_default()
            .push_back(reply);
    }

    /// Registers a container and returns the token that claims it.
    pub fn stage_container(&self, container: impl ContainerFile + 'static) -> u64 {
        self.state.lock().stage(Box::new(container))
    }

    /// Containers handed out by GETDIR or staged but never claimed.
    pub fn pending_containers(&self) -> usize {
        self.state.lock().containers.len()
    }

    /// Makes every later request fail as if the channel had closed.
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    /// Current attributes of `id`.
    pub fn attr(&self, id: u64) -> Option<WireAttr> {
        self.state.lock().nodes.get(&id).map(|node| node.attr)
    }

    /// Edits the attributes of `id` behind the bridge's back.
    pub fn update_attr(&self, id: u64, f: impl FnOnce(&mut WireAttr)) -> bool {
        match self.state.lock().nodes.get_mut(&id) {
            Some(node) => {
                f(&mut node.attr);
                true
            }
            None => false,
        }
    }

    /// Id bound to `name` in `parent`, if any.
    pub fn child(&self, parent: u64, name: &[u8]) -> Option<u64> {
        self.state.lock().child(parent, name).ok()
    }
}

impl Transport for MemoryDaemon {
    fn send(&self, request: &Request, _shape: ReplyShape) -> Result<Reply, TransportError> {
        let frame = request.encode_frame().map_err(|e| {
            TransportError::Io(io::Error::new(io::ErrorKind::OutOfMemory, e))
        })?;

        let mut state = self.state.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        self.requests.fetch_add(1, Ordering::Relaxed);

        let request = match Request::decode_frame(&frame) {
            Ok(request) => request,
            Err(_) => return Ok(Reply::errno(libc::EPROTO)),
        };
        let opcode = request.opcode();
        state.opcodes.push(opcode);
        trace!(opcode = %opcode, subject = request.subject(), "daemon request");

        if let Some(reply) = state.scripted.get_mut(&opcode).and_then(VecDeque::pop_front) {
            return Ok(reply);
        }

        let reply = match request.decode_body() {
            Ok(body) => match state.execute(request.subject(), body, opcode) {
                Ok(body) => Reply::success(body),
                Err(errno) => Reply::errno(errno),
            },
            Err(_) => Reply::errno(libc::EINVAL),
        };
        Ok(reply)
    }

    fn claim_container(&self, token: u64) -> Option<Box<dyn ContainerFile>> {
        self.state.lock().containers.remove(&token)
    }
}
