//! Operation handlers over the engine state.
//!
//! Each handler canonicalizes its path arguments, resolves them against the
//! tree, checks capacity before allocating and returns a POSIX-style error
//! otherwise. Handlers run under the engine lock and never suspend.

use std::time::SystemTime;

use super::capacity::CapacityAccountant;
use super::chunk::BLOCK_SIZE;
use super::node::{NODE_COST, Node, NodeBody, ROOT_COST, node_cost};
use super::tree::{self, NAME_MAX};
use crate::vfs::{DirEntry, FileAttr, FileType, SetAttr, StatFs, VfsError, VfsResult};

/// Root mode: directory, rwxr-xr-x.
const ROOT_MODE: u32 = 0o040755;

/// The whole mutable state of one filesystem: the tree and its budget.
#[derive(Debug)]
pub(crate) struct Namespace {
    root: Node,
    capacity: CapacityAccountant,
}

impl Namespace {
    /// Build an empty filesystem whose root is charged against `max_size`.
    pub fn new(max_size: u64) -> VfsResult<Self> {
        let mut capacity = CapacityAccountant::new(max_size);
        capacity
            .reserve(ROOT_COST)
            .map_err(|e| VfsError::out_of_space(format!("/ ({e})")))?;
        Ok(Self {
            root: Node::directory("/".to_string(), ROOT_MODE),
            capacity,
        })
    }

    pub fn capacity(&self) -> &CapacityAccountant {
        &self.capacity
    }

    /// Canonical form of `path`, with `..` steps checked against the tree.
    fn canonical(&self, path: &str) -> VfsResult<String> {
        tree::canonicalize_in(&self.root, path)
    }

    fn lookup(&self, path: &str) -> VfsResult<&Node> {
        tree::resolve(&self.root, path).ok_or_else(|| VfsError::not_found(path))
    }

    fn lookup_mut(&mut self, path: &str) -> VfsResult<&mut Node> {
        tree::resolve_mut(&mut self.root, path).ok_or_else(|| VfsError::not_found(path))
    }

    /// Parent directory of a node that is known to exist.
    fn parent_mut<'a>(root: &'a mut Node, path: &str) -> &'a mut Node {
        tree::resolve_mut(root, tree::dirname(path))
            .expect("every resolved node has a parent directory")
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.getattr")]
    pub fn getattr(&self, path: &str) -> VfsResult<FileAttr> {
        let path = self.canonical(path)?;
        Ok(self.lookup(&path)?.attr())
    }

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.open")]
    pub fn open(&self, path: &str) -> VfsResult<()> {
        let path = self.canonical(path)?;
        self.lookup(&path).map(|_| ())
    }

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.opendir")]
    pub fn opendir(&self, path: &str) -> VfsResult<()> {
        let path = self.canonical(path)?;
        if self.lookup(&path)?.is_dir() {
            Ok(())
        } else {
            Err(VfsError::not_a_directory(path))
        }
    }

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.readdir")]
    pub fn readdir(&self, path: &str) -> VfsResult<Vec<DirEntry>> {
        let path = self.canonical(path)?;
        let node = self.lookup(&path)?;
        if !node.is_dir() {
            return Err(VfsError::not_a_directory(path));
        }

        let mut entries = Vec::with_capacity(node.children().len() + 2);
        entries.push(DirEntry::directory("."));
        entries.push(DirEntry::directory(".."));
        entries.extend(node.children().iter().map(Node::dir_entry));
        Ok(entries)
    }

    // ========================================================================
    // Data
    // ========================================================================

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.read")]
    pub fn read(&self, path: &str, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let path = self.canonical(path)?;
        let node = self.lookup(&path)?;
        match &node.body {
            NodeBody::File { data } => Ok(data.read(offset, size as usize, node.size)),
            NodeBody::Directory { .. } => Err(VfsError::is_a_directory(path)),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, data), fields(len = data.len()), name = "ramdisk.write")]
    pub fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> VfsResult<u32> {
        let path = self.canonical(path)?;
        let written = u32::try_from(data.len())
            .map_err(|_| VfsError::other(format!("write of {} bytes is too large", data.len())))?;

        let node = tree::resolve_mut(&mut self.root, &path)
            .ok_or_else(|| VfsError::not_found(&path))?;
        let NodeBody::File { data: chain } = &mut node.body else {
            return Err(VfsError::is_a_directory(path));
        };
        if data.is_empty() {
            return Ok(0);
        }

        // A file that has never been written takes its first bytes at
        // offset 0, whatever offset was asked for.
        let offset = if chain.is_empty() { 0 } else { offset };
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or_else(|| VfsError::invalid_path(format!("{path}: offset out of range")))?;

        chain
            .write(offset, data, &mut self.capacity)
            .map_err(|e| VfsError::out_of_space(format!("{path} ({e})")))?;

        let now = SystemTime::now();
        node.size = node.size.max(end);
        node.atime = now;
        node.mtime = now;
        Ok(written)
    }

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.truncate")]
    pub fn truncate(&mut self, path: &str, size: u64) -> VfsResult<()> {
        let path = self.canonical(path)?;
        self.truncate_canonical(&path, size)
    }

    fn truncate_canonical(&mut self, path: &str, size: u64) -> VfsResult<()> {
        let node = tree::resolve_mut(&mut self.root, path)
            .ok_or_else(|| VfsError::not_found(path))?;
        let NodeBody::File { data } = &mut node.body else {
            return Err(VfsError::is_a_directory(path));
        };
        if size >= node.size {
            return Ok(());
        }

        data.truncate(size, &mut self.capacity);
        let now = SystemTime::now();
        node.size = size;
        node.mtime = now;
        node.ctime = now;
        Ok(())
    }

    // ========================================================================
    // Namespace
    // ========================================================================

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.create")]
    pub fn create(&mut self, path: &str, mode: u32) -> VfsResult<FileAttr> {
        let path = self.canonical(path)?;
        self.add_node(path, FileType::File, mode)
    }

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.mkdir")]
    pub fn mkdir(&mut self, path: &str, mode: u32) -> VfsResult<FileAttr> {
        let path = self.canonical(path)?;
        self.add_node(path, FileType::Directory, mode)
    }

    fn add_node(&mut self, path: String, kind: FileType, mode: u32) -> VfsResult<FileAttr> {
        if tree::resolve(&self.root, &path).is_some() {
            return Err(VfsError::already_exists(path));
        }

        let parent_path = tree::dirname(&path);
        let parent = tree::resolve_mut(&mut self.root, parent_path)
            .ok_or_else(|| VfsError::not_found(parent_path))?;
        if !parent.is_dir() {
            return Err(VfsError::not_a_directory(parent_path));
        }

        self.capacity
            .reserve(node_cost(path.len()))
            .map_err(|e| VfsError::out_of_space(format!("{path} ({e})")))?;

        let node = match kind {
            FileType::File => Node::file(path, mode),
            FileType::Directory => Node::directory(path, mode),
        };
        let attr = node.attr();
        tree::insert(parent, node);
        parent.link_count += 1;
        parent.touch_entries(attr.ctime);
        Ok(attr)
    }

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.unlink")]
    pub fn unlink(&mut self, path: &str) -> VfsResult<()> {
        let path = self.canonical(path)?;
        if self.lookup(&path)?.is_dir() {
            return Err(VfsError::is_a_directory(path));
        }
        self.detach_and_free(&path);
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.rmdir")]
    pub fn rmdir(&mut self, path: &str) -> VfsResult<()> {
        let path = self.canonical(path)?;
        if path == "/" {
            return Err(VfsError::permission_denied("cannot remove root"));
        }

        let node = self.lookup(&path)?;
        if !node.is_dir() {
            return Err(VfsError::not_a_directory(path));
        }
        if !node.children().is_empty() {
            return Err(VfsError::directory_not_empty(path));
        }
        self.detach_and_free(&path);
        Ok(())
    }

    /// Unhook an existing node from its parent and return its units.
    fn detach_and_free(&mut self, path: &str) {
        let parent = Self::parent_mut(&mut self.root, path);
        let mut node = tree::remove(parent, tree::basename(path))
            .expect("node was resolved under this parent");
        parent.link_count -= 1;
        parent.touch_entries(SystemTime::now());

        if let NodeBody::File { data } = &mut node.body {
            data.truncate(0, &mut self.capacity);
        }
        debug_assert!(node.children().is_empty(), "freeing non-empty {}", node.path);
        self.capacity.release(node.cost());
    }

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.rename")]
    pub fn rename(&mut self, from: &str, to: &str) -> VfsResult<()> {
        let from = self.canonical(from)?;
        let to = self.canonical(to)?;
        if from == "/" {
            return Err(VfsError::permission_denied("cannot rename root"));
        }

        let source = self.lookup(&from)?;
        let source_is_dir = source.is_dir();
        let rebased = source.subtree_len();
        if from == to {
            return Ok(());
        }
        if source_is_dir && tree::is_descendant(&to, &from) {
            return Err(VfsError::invalid_path(format!(
                "cannot move {from} into its own subtree {to}"
            )));
        }

        let to_parent = tree::dirname(&to);
        match tree::resolve(&self.root, to_parent).map(Node::kind) {
            None => return Err(VfsError::not_found(to_parent)),
            Some(FileType::File) => return Err(VfsError::not_a_directory(to_parent)),
            Some(FileType::Directory) => {}
        }

        let replaced = match tree::resolve(&self.root, &to) {
            Some(node) if node.is_dir() => return Err(VfsError::is_a_directory(&to)),
            Some(_) if source_is_dir => return Err(VfsError::not_a_directory(&to)),
            Some(node) => Some(node.charged_units()),
            None => None,
        };

        // Every rebased node's path changes length by the same amount.
        let growth = rebased * to.len().saturating_sub(from.len()) as u64;
        let shrink = rebased * from.len().saturating_sub(to.len()) as u64;
        let room = self.capacity.available() + replaced.unwrap_or(0);
        if growth > room {
            tracing::warn!(%from, %to, growth, room, "rename refused");
            return Err(VfsError::out_of_space(format!(
                "{to} ({growth} units needed, {room} available)"
            )));
        }

        if replaced.is_some() {
            tracing::debug!(%to, "replacing existing destination file");
            self.detach_and_free(&to);
        }
        if growth > 0 {
            self.capacity
                .reserve(growth)
                .map_err(|e| VfsError::out_of_space(format!("{to} ({e})")))?;
        }

        let now = SystemTime::now();
        let old_parent = Self::parent_mut(&mut self.root, &from);
        let mut node = tree::remove(old_parent, tree::basename(&from))
            .expect("source was resolved under this parent");
        old_parent.link_count -= 1;
        old_parent.touch_entries(now);

        tree::rebase(&mut node, to.clone());
        node.ctime = now;

        let new_parent = tree::resolve_mut(&mut self.root, to_parent)
            .expect("destination parent was checked before detaching");
        tree::insert(new_parent, node);
        new_parent.link_count += 1;
        new_parent.touch_entries(now);

        if shrink > 0 {
            self.capacity.release(shrink);
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), name = "ramdisk.setattr")]
    pub fn setattr(&mut self, path: &str, set: SetAttr) -> VfsResult<FileAttr> {
        let path = self.canonical(path)?;
        if let Some(size) = set.size {
            self.truncate_canonical(&path, size)?;
        }

        let node = self.lookup_mut(&path)?;
        if let Some(mode) = set.mode {
            node.mode = mode;
        }
        if let Some(atime) = set.atime {
            node.atime = atime;
        }
        if let Some(mtime) = set.mtime {
            node.mtime = mtime;
        }
        if !set.is_empty() {
            node.ctime = SystemTime::now();
        }
        Ok(node.attr())
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub fn statfs(&self) -> StatFs {
        let block = BLOCK_SIZE as u64;
        let max = self.capacity.max_size();
        let free = self.capacity.available();
        StatFs {
            blocks: max / block,
            bfree: free / block,
            bavail: free / block,
            files: max / NODE_COST,
            ffree: free / NODE_COST,
            bsize: BLOCK_SIZE as u32,
            namelen: NAME_MAX as u32,
            frsize: BLOCK_SIZE as u32,
        }
    }
}
