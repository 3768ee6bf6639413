//! Tile source drivers.
//!
//! A [`TileSource`] produces raw height grids for tile keys in the
//! layer's own profile. Real drivers (file formats, network services)
//! live outside this crate; [`MemorySource`] is a complete in-process
//! implementation used for synthetic layers and tests.

mod blacklist;
mod types;

pub use blacklist::Blacklist;
pub use types::{MemorySource, SourceError, TileSource};
