//! Layer configuration.

use serde::{Deserialize, Serialize};

use crate::cache::CachePolicy;
use crate::NO_DATA;

/// What to do with `NO_DATA` samples after synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoDataPolicy {
    /// Leave the sentinel in place for downstream interpolation.
    #[default]
    #[serde(alias = "default")]
    Interpolate,
    /// Rewrite `NO_DATA` to mean sea level.
    Msl,
}

/// Configuration for one elevation layer.
///
/// Deserializes from a config value with every field optional; absent
/// fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationLayerOptions {
    /// Layer name, used to tag log output.
    pub name: String,
    /// Disabled layers refuse all synthesis calls.
    pub enabled: bool,
    /// Invisible layers stay configured but are skipped by the
    /// compositor.
    pub visible: bool,
    /// Offset layers add onto the resolved base instead of competing
    /// for it.
    pub offset: bool,
    pub nodata_policy: NoDataPolicy,
    /// Samples per tile edge the source produces.
    pub tile_size: u32,
    /// Shallowest level this layer serves.
    pub min_level: u32,
    /// Deepest level this layer serves.
    pub max_level: u32,
    /// The source's own no-data sentinel, rewritten to the global one.
    pub no_data_value: f32,
    /// Samples below this are invalid.
    pub min_valid_value: f32,
    /// Samples above this are invalid.
    pub max_valid_value: f32,
    /// Entry capacity of the in-process grid cache; 0 disables it.
    pub mem_cache_size: usize,
    pub cache_policy: CachePolicy,
}

impl Default for ElevationLayerOptions {
    fn default() -> Self {
        Self {
            name: "elevation".into(),
            enabled: true,
            visible: true,
            offset: false,
            nodata_policy: NoDataPolicy::default(),
            tile_size: 257,
            min_level: 0,
            max_level: 23,
            no_data_value: NO_DATA,
            min_valid_value: -f32::MAX,
            max_valid_value: f32::MAX,
            mem_cache_size: 16,
            cache_policy: CachePolicy::default(),
        }
    }
}

impl ElevationLayerOptions {
    /// Options named for a specific source.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
