//! Caching for synthesized height grids.
//!
//! Two tiers, both keyed by `"<tileKey>_<profileSignature>"` strings:
//!
//! - [`MemoryCache`]: a small bounded in-process cache of decoded grids,
//!   one per layer.
//! - [`CacheBin`]: the persistent blob-store seam. [`FileBin`] stores
//!   one file per key; [`MemBin`] backs tests. Grids cross this boundary
//!   through the fixed-layout codec in [`codec`].
//!
//! Persistent entries always hold heights in the source layer's native
//! vertical datum; datum shifts happen on read into the requester.

pub mod codec;

mod bin;
mod memory;
mod types;

pub use bin::{CacheBin, FileBin, MemBin, ReadResult};
pub use memory::MemoryCache;
pub use types::{CacheError, CachePolicy, CacheUsage};
