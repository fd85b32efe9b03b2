//! Nodes: the in-memory inode records.

use std::time::SystemTime;

use super::chunk::{CHUNK_COST, ChunkChain};
use super::tree;
use crate::vfs::{DirEntry, FileAttr, FileType};

/// Fixed accounting units charged per node, on top of its path bytes.
pub const NODE_COST: u64 = std::mem::size_of::<Node>() as u64;

/// Units the root directory (`/`) is charged.
pub const ROOT_COST: u64 = node_cost(1);

/// Units charged for a node whose canonical path is `path_len` bytes long.
pub const fn node_cost(path_len: usize) -> u64 {
    NODE_COST + path_len as u64
}

/// Kind-specific payload.
#[derive(Debug)]
pub enum NodeBody {
    /// Children in creation order, owned by this directory.
    Directory { children: Vec<Node> },
    /// The file's bytes.
    File { data: ChunkChain },
}

/// A file or directory.
///
/// `path` is the canonical absolute path and the node's identity; no two
/// nodes in a tree share one.
#[derive(Debug)]
pub struct Node {
    pub(crate) path: String,
    pub(crate) mode: u32,
    pub(crate) size: u64,
    pub(crate) link_count: u32,
    pub(crate) atime: SystemTime,
    pub(crate) mtime: SystemTime,
    pub(crate) ctime: SystemTime,
    pub(crate) body: NodeBody,
}

impl Node {
    /// A new, empty directory. Starts with two links (itself and its entry
    /// in the parent).
    pub fn directory(path: String, mode: u32) -> Self {
        Self::new(path, mode, 2, NodeBody::Directory {
            children: Vec::new(),
        })
    }

    /// A new, never-written file.
    pub fn file(path: String, mode: u32) -> Self {
        Self::new(path, mode, 1, NodeBody::File {
            data: ChunkChain::new(),
        })
    }

    fn new(path: String, mode: u32, link_count: u32, body: NodeBody) -> Self {
        let now = SystemTime::now();
        Self {
            path,
            mode,
            size: 0,
            link_count,
            atime: now,
            mtime: now,
            ctime: now,
            body,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final path component (`/` for the root).
    pub fn name(&self) -> &str {
        tree::basename(&self.path)
    }

    pub fn kind(&self) -> FileType {
        match self.body {
            NodeBody::Directory { .. } => FileType::Directory,
            NodeBody::File { .. } => FileType::File,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind().is_dir()
    }

    /// Children of a directory; empty for files.
    pub fn children(&self) -> &[Node] {
        match &self.body {
            NodeBody::Directory { children } => children,
            NodeBody::File { .. } => &[],
        }
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children().iter().find(|c| c.name() == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        match &mut self.body {
            NodeBody::Directory { children } => children.iter_mut().find(|c| c.name() == name),
            NodeBody::File { .. } => None,
        }
    }

    pub fn attr(&self) -> FileAttr {
        FileAttr {
            size: self.size,
            kind: self.kind(),
            mode: self.mode,
            mtime: self.mtime,
            atime: self.atime,
            ctime: self.ctime,
            nlink: self.link_count,
        }
    }

    pub fn dir_entry(&self) -> DirEntry {
        match self.kind() {
            FileType::File => DirEntry::file(self.name()),
            FileType::Directory => DirEntry::directory(self.name()),
        }
    }

    /// Units this node itself holds: the record plus its path.
    pub fn cost(&self) -> u64 {
        node_cost(self.path.len())
    }

    /// Units held by this node and its chunks.
    pub fn charged_units(&self) -> u64 {
        match &self.body {
            NodeBody::File { data } => self.cost() + data.chunk_count() * CHUNK_COST,
            NodeBody::Directory { .. } => self.cost(),
        }
    }

    /// Number of nodes in this subtree, itself included.
    pub fn subtree_len(&self) -> u64 {
        1 + self.children().iter().map(Node::subtree_len).sum::<u64>()
    }

    /// Record a change to the directory's entries.
    pub(crate) fn touch_entries(&mut self, now: SystemTime) {
        self.mtime = now;
        self.ctime = now;
    }
}
