//! VFS operations trait.
//!
//! This is the fixed operation set a kernel bridge dispatches to. Every
//! call is path-based and carries explicit offsets and sizes, so the bridge
//! needs no handle state.

use async_trait::async_trait;
use std::path::Path;

use super::types::{DirEntry, FileAttr, SetAttr, StatFs};
use super::VfsResult;

/// Core VFS operations trait.
///
/// Paths are absolute within the filesystem (`/a/b.txt`); a missing leading
/// `/` is implied.
#[async_trait]
pub trait VfsOps: Send + Sync {
    // ========================================================================
    // Lookup
    // ========================================================================

    /// Get file attributes.
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Check that a path can be opened.
    ///
    /// There are no file handles; this only validates existence.
    async fn open(&self, path: &Path) -> VfsResult<()>;

    /// Check that a path is a directory that can be listed.
    async fn opendir(&self, path: &Path) -> VfsResult<()>;

    /// Read directory entries.
    ///
    /// Returns `.` and `..` followed by the children in creation order.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    // ========================================================================
    // Data
    // ========================================================================

    /// Read file contents.
    ///
    /// Reads up to `size` bytes starting at `offset`.
    /// Returns fewer bytes if EOF is reached.
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>>;

    /// Write data to a file.
    ///
    /// Writes `data` at the specified `offset`.
    /// Returns the number of bytes written.
    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32>;

    /// Shrink a file to the specified size.
    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()>;

    // ========================================================================
    // Namespace
    // ========================================================================

    /// Create a new file.
    ///
    /// Returns the attributes of the newly created file.
    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Create a new directory.
    ///
    /// Returns the attributes of the newly created directory.
    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Remove a file.
    async fn unlink(&self, path: &Path) -> VfsResult<()>;

    /// Remove an empty directory.
    async fn rmdir(&self, path: &Path) -> VfsResult<()>;

    /// Rename a file or directory, replacing an existing destination file.
    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()>;

    /// Set file attributes.
    async fn setattr(&self, path: &Path, attr: SetAttr) -> VfsResult<FileAttr>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Get filesystem statistics.
    async fn statfs(&self) -> VfsResult<StatFs>;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.getattr(path).await.is_ok()
    }

    /// Read entire file contents.
    async fn read_all(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let attr = self.getattr(path).await?;
        let size = u32::try_from(attr.size)
            .map_err(|_| super::VfsError::other("file too large for a single read"))?;
        self.read(path, 0, size).await
    }

    /// Write entire file contents.
    ///
    /// Convenience method that truncates and writes the whole file.
    async fn write_all(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        // Create or truncate
        if self.exists(path).await {
            self.truncate(path, 0).await?;
        } else {
            self.create(path, 0o100644).await?;
        }
        self.write(path, 0, data).await?;
        Ok(())
    }
}
