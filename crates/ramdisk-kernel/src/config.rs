//! Startup configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::engine::ROOT_COST;

/// Bytes in one megabyte, as used for the size parameter.
pub const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The megabyte count does not fit in a byte count.
    #[error("size of {0} MB is too large")]
    SizeOverflow(u64),

    /// The ceiling cannot even hold the root directory.
    #[error("capacity of {max_size} bytes is below the {required} bytes the root directory needs")]
    TooSmall { max_size: u64, required: u64 },
}

/// Where the filesystem is mounted and how much it may hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamdiskConfig {
    /// Mount target handed to the kernel bridge.
    pub mount_point: PathBuf,
    /// Capacity ceiling in bytes, covering node metadata and chunks.
    pub max_size: u64,
}

impl RamdiskConfig {
    /// Build a config with a ceiling given in bytes.
    pub fn new(mount_point: impl Into<PathBuf>, max_size: u64) -> Result<Self, ConfigError> {
        if max_size < ROOT_COST {
            return Err(ConfigError::TooSmall {
                max_size,
                required: ROOT_COST,
            });
        }
        Ok(Self {
            mount_point: mount_point.into(),
            max_size,
        })
    }

    /// Build a config from a size in megabytes (`size_mb * 1024 * 1024` bytes).
    pub fn from_megabytes(
        mount_point: impl Into<PathBuf>,
        size_mb: u64,
    ) -> Result<Self, ConfigError> {
        let max_size = size_mb
            .checked_mul(BYTES_PER_MEGABYTE)
            .ok_or(ConfigError::SizeOverflow(size_mb))?;
        Self::new(mount_point, max_size)
    }
}
