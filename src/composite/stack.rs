//! The layer stack compositor.

use std::sync::Arc;

use tracing::debug;

use super::normal::build_normal_map;
use crate::heightfield::{GeoHeightField, HeightGrid, Interpolation, NormalMap};
use crate::layer::Layer;
use crate::progress::Progress;
use crate::tile::{Profile, TileKey};
use crate::NO_DATA;

/// Neighbor-tile slots per entry: a 3x3 ring around the center tile.
/// Only the center slot is populated while border sampling is off, but
/// the shape is kept so enabling it stays a local change.
const NEIGHBOR_SLOTS: usize = 9;
const CENTER_SLOT: usize = 4;

/// Cap on contender grids held across all slots during one sweep.
const MAX_CACHED_GRIDS: usize = 50;

struct LayerEntry {
    layer: Arc<dyn Layer>,
    key: TileKey,
    /// Position in the stack, for ranking offsets against the base.
    index: usize,
}

/// An ordered stack of elevation layers. The last layer pushed has the
/// highest priority.
pub struct LayerStack {
    layers: Vec<Arc<dyn Layer>>,
    offsets_require_base: bool,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            offsets_require_base: true,
        }
    }

    /// Append a layer on top of the stack.
    pub fn push(&mut self, layer: Arc<dyn Layer>) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Layer>> {
        self.layers.iter()
    }

    /// Whether offset layers are skipped at pixels where no base layer
    /// resolved (the default). Disabling this restores the legacy
    /// behavior of adding offsets onto the `NO_DATA` sentinel.
    pub fn set_offsets_require_base(&mut self, require: bool) {
        self.offsets_require_base = require;
    }

    /// Composite the stack into `hf` (and `normal_map`, when supplied)
    /// for `key`.
    ///
    /// `hae_profile`, when given, rewrites the query key onto that
    /// profile so every source sample comes back as height above the
    /// ellipsoid. Pixels no contender resolves are left untouched.
    ///
    /// Returns true iff at least one sample came from non-fallback real
    /// data.
    pub fn populate(
        &self,
        hf: &mut HeightGrid,
        normal_map: Option<&mut NormalMap>,
        key: &TileKey,
        hae_profile: Option<&Arc<Profile>>,
        interpolation: Interpolation,
        progress: Option<&dyn Progress>,
    ) -> bool {
        let key_to_use = match hae_profile {
            Some(p) => TileKey::new(key.level(), key.x(), key.y(), Arc::clone(p)),
            None => key.clone(),
        };

        // Collect the usable layers, highest priority (last) first.
        let mut contenders: Vec<LayerEntry> = Vec::new();
        let mut offsets: Vec<LayerEntry> = Vec::new();
        let mut num_fallback_layers = 0usize;

        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            if !layer.is_enabled() || !layer.is_visible() {
                continue;
            }
            if !layer.is_key_in_legal_range(key) {
                continue;
            }

            // Adjust for the layer's tile resolution differential.
            let mapped_key = key_to_use.map_resolution(hf.columns(), layer.tile_size());

            let Some(best_key) = layer.best_available_tile_key(&mapped_key) else {
                continue;
            };
            // A best key short of the mapped key means this layer can
            // only provide fallback data here.
            if best_key != mapped_key {
                num_fallback_layers += 1;
            }

            let entry = LayerEntry {
                layer: Arc::clone(layer),
                key: best_key,
                index: i,
            };
            if layer.is_offset() {
                offsets.push(entry);
            } else {
                contenders.push(entry);
            }
        }

        if contenders.is_empty() && offsets.is_empty() {
            return false;
        }
        // Everything is fallback: the caller is better served by its
        // own ancestor tile.
        if contenders.len() + offsets.len() == num_fallback_layers {
            return false;
        }

        let columns = hf.columns();
        let rows = hf.rows();
        let extent = key.extent();
        let (xmin, ymin, _, _) = extent.bounds();
        let dx = extent.width() / (columns - 1) as f64;
        let dy = extent.height() / (rows - 1) as f64;
        let key_srs = key_to_use.profile().srs().clone();

        // Lazily fetched grids: per neighbor slot, per entry. The grid
        // is paired with the key that finally produced it, which may be
        // an ancestor of the entry's key.
        let mut height_fields: Vec<Vec<Option<(GeoHeightField, TileKey)>>> =
            vec![vec![None; contenders.len()]; NEIGHBOR_SLOTS];
        let mut height_fallback: Vec<Vec<bool>> =
            vec![vec![false; contenders.len()]; NEIGHBOR_SLOTS];
        let mut height_failed: Vec<Vec<bool>> =
            vec![vec![false; contenders.len()]; NEIGHBOR_SLOTS];
        let mut offset_fields: Vec<Vec<Option<GeoHeightField>>> =
            vec![vec![None; offsets.len()]; NEIGHBOR_SLOTS];
        let mut offset_failed: Vec<Vec<bool>> = vec![vec![false; offsets.len()]; NEIGHBOR_SLOTS];

        let mut num_grids_in_cache = 0usize;
        let mut real_data = false;
        let mut nodata_count = 0usize;
        let mut delta_lod = vec![0i16; columns as usize * rows as usize];

        for c in 0..columns {
            let x = xmin + dx * c as f64;
            for r in 0..rows {
                let y = ymin + dy * r as f64;

                let mut resolved_index: Option<usize> = None;

                for (ci, contender) in contenders.iter().enumerate() {
                    if resolved_index.is_some() {
                        break;
                    }

                    // Border sampling would pick a neighbor slot from
                    // the sample's position relative to the entry key's
                    // extent; with border width 0 every sample falls in
                    // the center tile.
                    let n = CENTER_SLOT;

                    if height_failed[n][ci] {
                        continue;
                    }

                    if height_fields[n][ci].is_none() {
                        // Fetch on demand, walking up the parent chain
                        // so we have data here even if it is fallback.
                        let mut actual_key = contender.key.clone();
                        let fetched = loop {
                            if !contender.layer.is_key_in_legal_range(&actual_key) {
                                break None;
                            }
                            match contender.layer.create_height_field(&actual_key, progress) {
                                Some(field) => break Some(field),
                                None => match actual_key.parent() {
                                    Some(parent) => actual_key = parent,
                                    None => break None,
                                },
                            }
                        };
                        match fetched {
                            Some(field) => {
                                height_fallback[n][ci] = actual_key != contender.key;
                                height_fields[n][ci] = Some((field, actual_key));
                                num_grids_in_cache += 1;
                            }
                            None => {
                                height_failed[n][ci] = true;
                                continue;
                            }
                        }
                    }

                    if let Some((field, actual_key)) = &height_fields[n][ci] {
                        // Only a non-fallback grid counts as real data.
                        if !height_fallback[n][ci] {
                            real_data = true;
                        }

                        if let Some(elevation) =
                            field.get_elevation(&key_srs, x, y, interpolation, &key_srs)
                        {
                            if elevation != NO_DATA {
                                // Remember the stack position so only
                                // offsets sitting on top of this layer
                                // apply.
                                resolved_index = Some(contender.index);
                                hf.set(c, r, elevation);
                                delta_lod[(r * columns + c) as usize] =
                                    (key.level() - actual_key.level()) as i16;
                            } else {
                                nodata_count += 1;
                            }
                        }
                    }

                    // Bound the working set across very large sweeps.
                    if num_grids_in_cache >= MAX_CACHED_GRIDS {
                        for slot in height_fields.iter_mut() {
                            for entry in slot.iter_mut() {
                                *entry = None;
                            }
                        }
                        for slot in height_fallback.iter_mut() {
                            for flag in slot.iter_mut() {
                                *flag = false;
                            }
                        }
                        num_grids_in_cache = 0;
                    }
                }

                // Apply offsets bottom-up so higher-priority offsets
                // land last.
                for (oi, offset) in offsets.iter().enumerate().rev() {
                    // An offset only applies on top of the resolved
                    // base layer.
                    if let Some(resolved) = resolved_index {
                        if offset.index < resolved {
                            continue;
                        }
                    } else if self.offsets_require_base {
                        continue;
                    }

                    let n = CENTER_SLOT;

                    if offset_failed[n][oi] {
                        continue;
                    }

                    if offset_fields[n][oi].is_none() {
                        match offset.layer.create_height_field(&offset.key, progress) {
                            Some(field) => offset_fields[n][oi] = Some(field),
                            None => {
                                offset_failed[n][oi] = true;
                                continue;
                            }
                        }
                    }

                    if let Some(field) = &offset_fields[n][oi] {
                        // Having an offset layer at all counts as real
                        // data.
                        real_data = true;

                        if let Some(elevation) =
                            field.get_elevation(&key_srs, x, y, interpolation, &key_srs)
                        {
                            if elevation != NO_DATA {
                                hf.add(c, r, elevation);
                                delta_lod[(r * columns + c) as usize] =
                                    (key.level() - offset.key.level()) as i16;
                            }
                        }
                    }
                }
            }
        }

        if nodata_count > 0 {
            debug!(key = %key, nodata_count, "contenders yielded NO_DATA samples");
        }

        if let Some(normal_map) = normal_map {
            build_normal_map(&extent, hf, &delta_lod, normal_map);
        }

        real_data
    }
}
