//! Virtual Filesystem surface.
//!
//! This module is what a kernel bridge programs against.
//! Key components:
//!
//! - [`VfsOps`] - The fixed operation set (getattr, read, write, rename, ...)
//! - [`VfsError`] - Status taxonomy, convertible to errno and `std::io::Error`
//! - [`FileAttr`], [`DirEntry`], [`SetAttr`], [`StatFs`] - Values crossing the bridge
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations use paths, not inode numbers.
//!   The bridge handles inode ↔ path mapping if its kernel interface needs it.
//! - **Explicit offset/size**: Read/write take offset and size, so there is
//!   no handle state to keep in sync.

mod error;
mod ops;
mod types;

pub use error::{VfsError, VfsResult};
pub use ops::VfsOps;
pub use types::{DirEntry, FileAttr, FileType, SetAttr, StatFs};
