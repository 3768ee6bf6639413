//! Cache policy and errors.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error from a cache backend.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored blob cannot be decoded into a height grid.
    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}

/// How a layer is allowed to use its persistent cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheUsage {
    /// Read and write the cache around source fetches.
    #[default]
    ReadWrite,
    /// Never touch the cache.
    NoCache,
    /// Serve from the cache only; never hit the source.
    CacheOnly,
}

/// Per-layer cache policy: usage mode plus an optional entry lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    pub usage: CacheUsage,
    /// Maximum entry age in seconds; `None` means entries never expire.
    pub max_age_secs: Option<u64>,
}

impl CachePolicy {
    pub fn cache_only() -> Self {
        Self {
            usage: CacheUsage::CacheOnly,
            max_age_secs: None,
        }
    }

    pub fn no_cache() -> Self {
        Self {
            usage: CacheUsage::NoCache,
            max_age_secs: None,
        }
    }

    pub fn is_cache_only(&self) -> bool {
        self.usage == CacheUsage::CacheOnly
    }

    pub fn is_cache_readable(&self) -> bool {
        self.usage != CacheUsage::NoCache
    }

    pub fn is_cache_writeable(&self) -> bool {
        self.usage == CacheUsage::ReadWrite
    }

    /// True if an entry written at `last_modified` has outlived
    /// `max_age_secs`.
    pub fn is_expired(&self, last_modified: SystemTime) -> bool {
        match self.max_age_secs {
            None => false,
            Some(secs) => match last_modified.elapsed() {
                Ok(age) => age > Duration::from_secs(secs),
                Err(_) => false, // clock skew: treat future entries as fresh
            },
        }
    }
}
