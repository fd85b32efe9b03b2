//! # ramdisk-kernel
//!
//! A capacity-bounded filesystem that lives entirely in memory.
//!
//! The engine keeps a tree of nodes rooted at `/`. Directories own their
//! children in creation order; files own a chain of 512-byte chunks. Every
//! node and chunk is charged against a fixed byte ceiling before it is
//! allocated, and operations that would exceed it fail with `ENOSPC`.
//!
//! Callers (typically a kernel bridge such as a FUSE adapter) drive it
//! through [`VfsOps`], a path-based operation set whose errors map onto POSIX
//! error numbers.

pub mod config;
pub mod engine;
pub mod vfs;

pub use config::{ConfigError, RamdiskConfig};
pub use engine::{BLOCK_SIZE, CHUNK_COST, NODE_COST, ROOT_COST, Ramdisk, Usage, node_cost};
pub use vfs::{DirEntry, FileAttr, FileType, SetAttr, StatFs, VfsError, VfsOps, VfsResult};
