//! Fixed-layout blob encoding for height grids.
//!
//! Persistent bins store opaque byte blobs; this codec defines the
//! layout: a magic tag, little-endian header (dimensions, border,
//! origin, steps), then the raw `f32` samples. Decoding re-validates
//! the header so a truncated or foreign blob can never produce a grid
//! that violates the storage invariant.

use crate::cache::types::CacheError;
use crate::heightfield::{HeightGrid, MAX_GRID_DIM, MIN_GRID_DIM};

const MAGIC: &[u8; 4] = b"THG1";
const HEADER_LEN: usize = 4 + 4 + 4 + 4 + 8 * 4;

/// Serialize a grid to the blob layout.
pub fn encode(grid: &HeightGrid) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + grid.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&grid.columns().to_le_bytes());
    out.extend_from_slice(&grid.rows().to_le_bytes());
    out.extend_from_slice(&grid.border_width().to_le_bytes());
    let (ox, oy) = grid.origin();
    out.extend_from_slice(&ox.to_le_bytes());
    out.extend_from_slice(&oy.to_le_bytes());
    out.extend_from_slice(&grid.x_interval().to_le_bytes());
    out.extend_from_slice(&grid.y_interval().to_le_bytes());
    out.extend_from_slice(bytemuck::cast_slice(grid.heights()));
    out
}

/// Deserialize a blob produced by [`encode`].
pub fn decode(blob: &[u8]) -> Result<HeightGrid, CacheError> {
    if blob.len() < HEADER_LEN {
        return Err(CacheError::Corrupt("blob shorter than header".into()));
    }
    if &blob[0..4] != MAGIC {
        return Err(CacheError::Corrupt("bad magic".into()));
    }

    let columns = u32::from_le_bytes(blob[4..8].try_into().unwrap());
    let rows = u32::from_le_bytes(blob[8..12].try_into().unwrap());
    let border = u32::from_le_bytes(blob[12..16].try_into().unwrap());
    let ox = f64::from_le_bytes(blob[16..24].try_into().unwrap());
    let oy = f64::from_le_bytes(blob[24..32].try_into().unwrap());
    let dx = f64::from_le_bytes(blob[32..40].try_into().unwrap());
    let dy = f64::from_le_bytes(blob[40..48].try_into().unwrap());

    if !(MIN_GRID_DIM..=MAX_GRID_DIM).contains(&columns)
        || !(MIN_GRID_DIM..=MAX_GRID_DIM).contains(&rows)
    {
        return Err(CacheError::Corrupt(format!(
            "dimensions {columns}x{rows} out of range"
        )));
    }

    let expected = columns as usize * rows as usize;
    let body = &blob[HEADER_LEN..];
    if body.len() != expected * 4 {
        return Err(CacheError::Corrupt(format!(
            "payload holds {} bytes, expected {}",
            body.len(),
            expected * 4
        )));
    }

    let mut heights = vec![0f32; expected];
    bytemuck::cast_slice_mut::<f32, u8>(&mut heights).copy_from_slice(body);

    let mut grid = HeightGrid::from_heights(columns, rows, heights)
        .map_err(|e| CacheError::Corrupt(e.to_string()))?;
    grid.set_origin(ox, oy);
    grid.set_intervals(dx, dy);
    grid.set_border_width(border);
    Ok(grid)
}
