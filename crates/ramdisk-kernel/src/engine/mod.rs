//! The in-memory filesystem engine.
//!
//! - [`chunk`] - Fixed-size chunk chains holding file bytes
//! - [`capacity`] - The byte budget every allocation is checked against
//! - [`node`] / [`tree`] - The node graph and path resolution
//! - `handlers` - The operations, run against the locked state
//!
//! [`Ramdisk`] owns all of it behind one lock and exposes it through
//! [`VfsOps`].

pub mod capacity;
pub mod chunk;
mod handlers;
pub mod node;
pub mod tree;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;

use crate::config::RamdiskConfig;
use crate::vfs::{DirEntry, FileAttr, SetAttr, StatFs, VfsError, VfsOps, VfsResult};
use handlers::Namespace;

pub use capacity::{CapacityAccountant, CapacityExceeded};
pub use chunk::{BLOCK_SIZE, CHUNK_COST};
pub use node::{NODE_COST, ROOT_COST, node_cost};

/// Snapshot of the capacity counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    /// Configured ceiling.
    pub max_size: u64,
    /// Units committed to nodes and chunks.
    pub curr_size: u64,
}

impl Usage {
    /// Units still available.
    pub fn available(&self) -> u64 {
        self.max_size - self.curr_size
    }
}

/// A capacity-bounded, in-memory filesystem.
///
/// Every operation, reads included, takes the same exclusive lock, so
/// callers on any number of threads see operations one at a time.
pub struct Ramdisk {
    state: Mutex<Namespace>,
}

impl std::fmt::Debug for Ramdisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ramdisk")
            .field("usage", &self.usage())
            .finish()
    }
}

impl Ramdisk {
    /// Create an empty filesystem sized by `config`.
    pub fn new(config: &RamdiskConfig) -> VfsResult<Self> {
        Self::with_max_size(config.max_size)
    }

    /// Create an empty filesystem with a ceiling of `max_size` bytes.
    ///
    /// Fails with `OutOfSpace` if the ceiling cannot hold the root directory.
    pub fn with_max_size(max_size: u64) -> VfsResult<Self> {
        let state = Namespace::new(max_size)?;
        tracing::debug!(max_size, "ramdisk created");
        Ok(Self {
            state: Mutex::new(state),
        })
    }

    /// Current capacity counters.
    pub fn usage(&self) -> Usage {
        let state = self.state.lock();
        let capacity = state.capacity();
        Usage {
            max_size: capacity.max_size(),
            curr_size: capacity.curr_size(),
        }
    }

    fn path_str(path: &Path) -> VfsResult<&str> {
        path.to_str()
            .ok_or_else(|| VfsError::invalid_path(path.display().to_string()))
    }
}

#[async_trait]
impl VfsOps for Ramdisk {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        self.state.lock().getattr(Self::path_str(path)?)
    }

    async fn open(&self, path: &Path) -> VfsResult<()> {
        self.state.lock().open(Self::path_str(path)?)
    }

    async fn opendir(&self, path: &Path) -> VfsResult<()> {
        self.state.lock().opendir(Self::path_str(path)?)
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        self.state.lock().readdir(Self::path_str(path)?)
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        self.state.lock().read(Self::path_str(path)?, offset, size)
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32> {
        self.state.lock().write(Self::path_str(path)?, offset, data)
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        self.state.lock().truncate(Self::path_str(path)?, size)
    }

    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        self.state.lock().create(Self::path_str(path)?, mode)
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        self.state.lock().mkdir(Self::path_str(path)?, mode)
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        self.state.lock().unlink(Self::path_str(path)?)
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        self.state.lock().rmdir(Self::path_str(path)?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        let (from, to) = (Self::path_str(from)?, Self::path_str(to)?);
        self.state.lock().rename(from, to)
    }

    async fn setattr(&self, path: &Path, attr: SetAttr) -> VfsResult<FileAttr> {
        self.state.lock().setattr(Self::path_str(path)?, attr)
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        Ok(self.state.lock().statfs())
    }
}
