//! Single-layer tile synthesis.
//!
//! [`ElevationLayer`] turns a tile key into a validated, datum-correct
//! [`GeoHeightField`] from one source, consulting the in-process cache,
//! then the persistent bin, then the driver; failed keys are
//! blacklisted, and keys in a foreign profile are assembled from the
//! intersecting tiles of the layer's own pyramid.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::options::{ElevationLayerOptions, NoDataPolicy};
use super::status::LayerStatus;
use super::Layer;
use crate::cache::{CacheBin, CachePolicy, MemoryCache};
use crate::geo::VerticalDatum;
use crate::heightfield::{
    resolve_invalid_heights, sort_by_resolution_descending, validate_height_grid, GeoHeightField,
    HeightGrid, Interpolation, NoDataNormalizer,
};
use crate::progress::{is_transient_failure, Progress};
use crate::source::TileSource;
use crate::tile::{Profile, TileKey};
use crate::NO_DATA;

/// A configured elevation source.
///
/// Read-mostly after construction: synthesis calls share the layer
/// behind an `Arc` and only touch the status, the caches and the lazily
/// built pre-cache normalizer, each behind its own synchronization.
pub struct ElevationLayer {
    options: ElevationLayerOptions,
    profile: Option<Arc<Profile>>,
    source: Option<Arc<dyn TileSource>>,
    cache_bin: Option<Arc<dyn CacheBin>>,
    mem_cache: Option<MemoryCache>,
    pre_cache_op: OnceCell<Arc<NoDataNormalizer>>,
    status: RwLock<LayerStatus>,
}

impl ElevationLayer {
    pub fn new(options: ElevationLayerOptions) -> Self {
        let mem_cache = match options.mem_cache_size {
            0 => None,
            n => Some(MemoryCache::new(n)),
        };
        Self {
            options,
            profile: None,
            source: None,
            cache_bin: None,
            mem_cache,
            pre_cache_op: OnceCell::new(),
            status: RwLock::new(LayerStatus::Fresh),
        }
    }

    /// Attach the driver producing this layer's grids.
    pub fn with_source(mut self, source: Arc<dyn TileSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach the layer's tile pyramid profile.
    pub fn with_profile(mut self, profile: Arc<Profile>) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Attach a persistent cache bin.
    pub fn with_cache_bin(mut self, bin: Arc<dyn CacheBin>) -> Self {
        self.cache_bin = Some(bin);
        self
    }

    pub fn options(&self) -> &ElevationLayerOptions {
        &self.options
    }

    pub fn profile(&self) -> Option<&Arc<Profile>> {
        self.profile.as_ref()
    }

    pub fn source(&self) -> Option<&Arc<dyn TileSource>> {
        self.source.as_ref()
    }

    pub fn status(&self) -> LayerStatus {
        self.status.read().clone()
    }

    /// Clears the blacklist and the in-process cache, allowing
    /// previously failed keys to be queried again.
    pub fn reset(&self) {
        if let Some(source) = &self.source {
            source.blacklist().clear();
        }
        if let Some(mem) = &self.mem_cache {
            mem.clear();
        }
    }

    fn open_if_fresh(&self) {
        let mut status = self.status.write();
        if *status == LayerStatus::Fresh {
            *status = LayerStatus::Opening;
            *status = LayerStatus::Ok;
        }
    }

    /// Puts the layer into its terminal error state. Every further
    /// synthesis call returns `None`.
    fn disable(&self, reason: &str) {
        warn!(layer = %self.options.name, reason, "disabling elevation layer");
        let mut status = self.status.write();
        if !status.is_error() {
            *status = LayerStatus::Error(reason.to_string());
        }
    }

    fn pre_cache_op(&self) -> &Arc<NoDataNormalizer> {
        self.pre_cache_op.get_or_init(|| {
            Arc::new(NoDataNormalizer::new(
                self.options.no_data_value,
                self.options.min_valid_value,
                self.options.max_valid_value,
            ))
        })
    }

    fn cache_key_for(key: &TileKey) -> String {
        format!("{}_{}", key.str_key(), key.profile().full_signature())
    }

    fn cache_policy(&self) -> CachePolicy {
        self.options.cache_policy
    }

    /// Synthesize this layer's height field for `key`.
    ///
    /// Returns `None` when the layer is errored or disabled, the key is
    /// out of range, or no tier could produce a valid grid.
    pub fn create_height_field(
        &self,
        key: &TileKey,
        progress: Option<&dyn Progress>,
    ) -> Option<GeoHeightField> {
        if self.status.read().is_error() {
            return None;
        }
        if !self.options.enabled {
            return None;
        }
        self.open_if_fresh();

        let cache_key = Self::cache_key_for(key);
        let policy = self.cache_policy();

        // In-process cache first.
        let mut from_mem_cache = false;
        let mut grid: Option<Arc<HeightGrid>> = None;
        if let Some(mem) = &self.mem_cache {
            if let Some(hit) = mem.get(&cache_key) {
                debug!(layer = %self.options.name, key = %key, "memory cache hit");
                grid = Some(hit);
                from_mem_cache = true;
            }
        }

        if grid.is_none() {
            // Can we continue? Only with a working driver, or in
            // cache-only mode with a bin to read from.
            let can_continue =
                self.source.is_some() || (policy.is_cache_only() && self.cache_bin.is_some());
            if !can_continue {
                self.disable("layer has no tile source and no cache to fall back on");
                return None;
            }
            if !policy.is_cache_only() && self.profile.is_none() {
                self.disable("could not establish a valid profile");
                return None;
            }

            // Persistent cache next. An expired entry is kept aside as
            // a fallback should the source fail.
            let mut from_cache = false;
            let mut expired_grid: Option<HeightGrid> = None;
            let mut fresh: Option<HeightGrid> = None;
            if policy.is_cache_readable() {
                if let Some(bin) = &self.cache_bin {
                    let result = bin.read(&cache_key, progress);
                    if result.succeeded() {
                        let expired = result
                            .last_modified()
                            .is_some_and(|t| policy.is_expired(t));
                        if let Some(cached) = result.take_grid() {
                            if validate_height_grid(&cached) {
                                if expired {
                                    expired_grid = Some(cached);
                                } else {
                                    fresh = Some(cached);
                                    from_cache = true;
                                }
                            }
                        }
                    }
                }
            }

            // Cache-only mode fails silently on a miss.
            if fresh.is_none() && policy.is_cache_only() {
                return None;
            }

            if fresh.is_none() {
                if !self.is_key_in_legal_range(key) {
                    return None;
                }
                if !self.source.as_ref().is_some_and(|s| s.is_ok()) {
                    return None;
                }

                let mut fetched = self.create_from_source(key, progress);

                if let Some(g) = &fetched {
                    if !validate_height_grid(g) {
                        let driver = self.source.as_ref().map_or("<none>", |s| s.name());
                        warn!(
                            layer = %self.options.name,
                            driver,
                            key = %key,
                            "driver returned an illegal height grid"
                        );
                        fetched = None; // fall back on cached data if possible
                    }
                }

                if let (Some(g), Some(bin)) = (&fetched, &self.cache_bin) {
                    if !from_cache && policy.is_cache_writeable() {
                        if let Err(e) = bin.write(&cache_key, g, progress) {
                            warn!(layer = %self.options.name, key = %key, error = %e, "cache write failed");
                        }
                    }
                }

                if fetched.is_none() && expired_grid.is_some() {
                    debug!(layer = %self.options.name, key = %key, "using cached but expired height grid");
                    fetched = expired_grid.take();
                }

                fresh = Some(fetched?);
            }

            // Stamp georeferencing from the key's extent.
            let mut g = fresh?;
            let extent = key.extent();
            let (xmin, ymin, _, _) = extent.bounds();
            g.set_origin(xmin, ymin);
            g.set_intervals(
                extent.width() / (g.columns() - 1).max(1) as f64,
                extent.height() / (g.rows() - 1).max(1) as f64,
            );
            g.set_border_width(0);
            grid = Some(Arc::new(g));
        }

        let mut grid = grid?;

        if !from_mem_cache {
            if let Some(mem) = &self.mem_cache {
                mem.put(cache_key, Arc::clone(&grid));
            }
        }

        // MSL policy: flatten remaining holes to sea level.
        if self.options.nodata_policy == NoDataPolicy::Msl
            && grid.heights().iter().any(|&h| h == NO_DATA)
        {
            let extent = key.extent();
            let requester_datum = extent.srs().vertical_datum();
            let geoid = match requester_datum {
                // A concrete output datum: zero is sea level there.
                Some(_) => None,
                // Ellipsoidal output: borrow the source datum's geoid
                // so holes land at its sea-level surface.
                None => self
                    .profile
                    .as_ref()
                    .and_then(|p| p.srs().vertical_datum())
                    .and_then(|v| v.geoid()),
            };
            let mut resolved = (*grid).clone();
            resolve_invalid_heights(&mut resolved, &extent, geoid);
            grid = Arc::new(resolved);
        }

        Some(GeoHeightField::new(grid, key.extent()))
    }

    /// Fetch `key` from the driver, or assemble it from the layer's own
    /// pyramid when the profiles disagree horizontally.
    fn create_from_source(
        &self,
        key: &TileKey,
        progress: Option<&dyn Progress>,
    ) -> Option<HeightGrid> {
        let source = self.source.as_ref()?;
        let profile = self.profile.as_ref()?;

        if !key.profile().is_horiz_equivalent_to(profile) {
            return self.assemble_height_field(key, progress);
        }

        if source.blacklist().contains(key) {
            debug!(layer = %self.options.name, key = %key, "tile is blacklisted");
            return None;
        }
        if !source.may_have_data(key) {
            debug!(layer = %self.options.name, key = %key, "source has no data here");
            return None;
        }

        let op = self.pre_cache_op();
        match source.create_height_grid(key, Some(op.as_ref()), progress) {
            Ok(mut grid) => {
                // The driver's heights are relative to the layer's
                // vertical datum; shift into the requested one.
                if !key.extent().srs().is_vert_equivalent_to(profile.srs()) {
                    VerticalDatum::transform_grid(
                        profile.srs().vertical_datum().map(|v| v.as_ref()),
                        key.extent().srs().vertical_datum().map(|v| v.as_ref()),
                        &key.extent(),
                        &mut grid,
                    );
                }
                Some(grid)
            }
            Err(e) => {
                debug!(layer = %self.options.name, key = %key, error = %e, "source fetch failed");
                if !is_transient_failure(progress) {
                    source.blacklist().add(key.clone());
                }
                None
            }
        }
    }

    /// Reprojection by supersampling: synthesize every intersecting
    /// tile of the layer's own profile and sample them finest-first
    /// into a grid matching the requested key.
    fn assemble_height_field(
        &self,
        key: &TileKey,
        progress: Option<&dyn Progress>,
    ) -> Option<HeightGrid> {
        let profile = self.profile.as_ref()?;

        let mut fields: Vec<GeoHeightField> = Vec::new();
        for layer_key in profile.intersecting_tiles(key) {
            if !self.is_key_in_legal_range(&layer_key) {
                continue;
            }
            if let Some(field) = self.create_height_field(&layer_key, progress) {
                fields.push(field);
            }
        }
        if fields.is_empty() {
            return None;
        }

        let columns = fields.iter().map(|f| f.grid().columns()).max()?;
        let rows = fields.iter().map(|f| f.grid().rows()).max()?;

        sort_by_resolution_descending(&mut fields);

        let extent = key.extent();
        let (xmin, ymin, _, _) = extent.bounds();
        let dx = extent.width() / (columns - 1) as f64;
        let dy = extent.height() / (rows - 1) as f64;
        let srs = extent.srs();

        let mut out = HeightGrid::filled(columns, rows, NO_DATA);
        for c in 0..columns {
            let x = xmin + dx * c as f64;
            for r in 0..rows {
                let y = ymin + dy * r as f64;
                // First field able to answer wins.
                for field in &fields {
                    if let Some(h) =
                        field.get_elevation(srs, x, y, Interpolation::Bilinear, srs)
                    {
                        out.set(c, r, h);
                        break;
                    }
                }
            }
        }
        Some(out)
    }

    pub fn is_key_in_legal_range(&self, key: &TileKey) -> bool {
        key.level() >= self.options.min_level && key.level() <= self.options.max_level
    }

    /// The deepest key at or above `key` this layer can serve, clamped
    /// to the configured max level and the source's data coverage.
    pub fn best_available_tile_key(&self, key: &TileKey) -> Option<TileKey> {
        if !key.is_valid() {
            return None;
        }
        let max_data = self
            .source
            .as_ref()
            .map_or(self.options.max_level, |s| s.max_data_level());
        let target = key.level().min(self.options.max_level).min(max_data);
        let best = if target < key.level() {
            key.ancestor(target)
        } else {
            key.clone()
        };
        match &self.source {
            Some(s) if !s.may_have_data(&best) => None,
            _ => Some(best),
        }
    }
}

impl Layer for ElevationLayer {
    fn name(&self) -> &str {
        &self.options.name
    }

    fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    fn is_visible(&self) -> bool {
        self.options.visible
    }

    fn is_offset(&self) -> bool {
        self.options.offset
    }

    fn tile_size(&self) -> u32 {
        self.options.tile_size
    }

    fn is_key_in_legal_range(&self, key: &TileKey) -> bool {
        ElevationLayer::is_key_in_legal_range(self, key)
    }

    fn best_available_tile_key(&self, key: &TileKey) -> Option<TileKey> {
        ElevationLayer::best_available_tile_key(self, key)
    }

    fn create_height_field(
        &self,
        key: &TileKey,
        progress: Option<&dyn Progress>,
    ) -> Option<GeoHeightField> {
        ElevationLayer::create_height_field(self, key, progress)
    }
}
