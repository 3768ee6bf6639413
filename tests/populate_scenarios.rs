//! End-to-end compositing scenarios against in-memory sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec3;

use terralayer::composite::LayerStack;
use terralayer::geo::{Geoid, Srs, VerticalDatum, MERCATOR_BOUND};
use terralayer::heightfield::{GridOp, HeightGrid, Interpolation, NormalMap};
use terralayer::layer::{ElevationLayer, ElevationLayerOptions, Layer, NoDataPolicy};
use terralayer::progress::Progress;
use terralayer::source::{Blacklist, MemorySource, SourceError, TileSource};
use terralayer::tile::{Profile, TileKey};
use terralayer::NO_DATA;

fn geodetic() -> Arc<Profile> {
    Arc::new(Profile::global_geodetic())
}

fn geo_key(level: u32, x: u32, y: u32) -> TileKey {
    TileKey::new(level, x, y, geodetic())
}

fn ramp_grid(size: u32) -> HeightGrid {
    let mut g = HeightGrid::new(size, size);
    for r in 0..size {
        for c in 0..size {
            g.set(c, r, (c + r) as f32);
        }
    }
    g
}

fn layer_over(source: Arc<dyn TileSource>, options: ElevationLayerOptions) -> Arc<dyn Layer> {
    Arc::new(
        ElevationLayer::new(options)
            .with_profile(geodetic())
            .with_source(source),
    )
}

/// Seeds `source` with a constant-height grid for every tile of the
/// given levels.
fn seed_levels(source: &MemorySource, levels: std::ops::Range<u32>, size: u32, height: f32) {
    for level in levels {
        let (nx, ny) = Profile::global_geodetic().num_tiles(level);
        for x in 0..nx {
            for y in 0..ny {
                source.insert(geo_key(level, x, y), HeightGrid::filled(size, size, height));
            }
        }
    }
}

#[test]
fn single_base_layer_reproduces_exact_grid() {
    let source = Arc::new(MemorySource::new("ramp"));
    let key = geo_key(2, 3, 1);
    source.insert(key.clone(), ramp_grid(257));

    let mut stack = LayerStack::new();
    stack.push(layer_over(source, ElevationLayerOptions::named("ramp")));

    let mut hf = HeightGrid::filled(257, 257, NO_DATA);
    let ok = stack.populate(&mut hf, None, &key, None, Interpolation::Bilinear, None);
    assert!(ok);

    for r in 0..257 {
        for c in 0..257 {
            let expected = (c + r) as f32;
            assert!(
                (hf.get(c, r) - expected).abs() < 1e-3,
                "pixel ({c}, {r}) = {}, expected {expected}",
                hf.get(c, r)
            );
        }
    }
}

#[test]
fn base_plus_offset_sums_and_normals_point_up() {
    let base_source = Arc::new(MemorySource::new("base"));
    let offset_source = Arc::new(MemorySource::new("bump"));
    seed_levels(&base_source, 0..4, 17, 100.0);
    seed_levels(&offset_source, 0..4, 17, 5.0);

    let mut base_options = ElevationLayerOptions::named("base");
    base_options.tile_size = 17;
    let mut offset_options = ElevationLayerOptions::named("bump");
    offset_options.tile_size = 17;
    offset_options.offset = true;

    let mut stack = LayerStack::new();
    stack.push(layer_over(base_source, base_options));
    stack.push(layer_over(offset_source, offset_options));

    let key = geo_key(2, 1, 1);
    let mut hf = HeightGrid::filled(17, 17, NO_DATA);
    let mut nm = NormalMap::new(17, 17);
    let ok = stack.populate(
        &mut hf,
        Some(&mut nm),
        &key,
        None,
        Interpolation::Bilinear,
        None,
    );
    assert!(ok);

    for r in 0..17 {
        for c in 0..17 {
            assert_eq!(hf.get(c, r), 105.0);
            assert_eq!(nm.get(c, r), Vec3::Z);
        }
    }
}

#[test]
fn lone_fallback_layer_fills_pixels_but_reports_false() {
    // Data exists only at level 3; the request is at level 5.
    let source = Arc::new(MemorySource::new("coarse").with_max_data_level(3));
    seed_levels(&source, 3..4, 17, 777.0);

    let mut options = ElevationLayerOptions::named("coarse");
    options.tile_size = 17;
    let layer = layer_over(Arc::clone(&source) as Arc<dyn TileSource>, options);

    let key = geo_key(5, 10, 7);
    assert_eq!(
        layer.best_available_tile_key(&key).unwrap().level(),
        3,
        "coverage clamp should land on level 3"
    );

    let mut stack = LayerStack::new();
    stack.push(layer);

    let mut hf = HeightGrid::filled(17, 17, NO_DATA);
    let ok = stack.populate(&mut hf, None, &key, None, Interpolation::Bilinear, None);

    // Everything on offer is fallback, so the compositor declines.
    assert!(!ok);
    assert!(hf.heights().iter().all(|&h| h == NO_DATA));
}

#[test]
fn parent_walk_fills_from_ancestor_and_reports_false() {
    // The source claims deep coverage but only actually serves level 3,
    // forcing the per-pixel fetch to walk up the parent chain.
    let source = Arc::new(MemorySource::new("liar"));
    seed_levels(&source, 3..4, 17, 333.0);

    let mut options = ElevationLayerOptions::named("liar");
    options.tile_size = 17;

    let mut stack = LayerStack::new();
    stack.push(layer_over(source, options));

    let key = geo_key(5, 10, 7);
    let mut hf = HeightGrid::filled(17, 17, NO_DATA);
    let ok = stack.populate(&mut hf, None, &key, None, Interpolation::Bilinear, None);

    // Pixels fill from the level-3 ancestor, but every sample is
    // fallback data.
    assert!(!ok);
    assert!(hf.heights().iter().all(|&h| h == 333.0));
}

#[test]
fn fallback_layer_beats_lower_priority_real_data() {
    let coarse = Arc::new(MemorySource::new("coarse").with_max_data_level(3));
    seed_levels(&coarse, 3..4, 17, 500.0);
    let fine = Arc::new(MemorySource::new("fine"));
    seed_levels(&fine, 5..6, 17, 100.0);

    let mut coarse_options = ElevationLayerOptions::named("coarse");
    coarse_options.tile_size = 17;
    let mut fine_options = ElevationLayerOptions::named("fine");
    fine_options.tile_size = 17;

    let mut stack = LayerStack::new();
    stack.push(layer_over(fine, fine_options));
    stack.push(layer_over(coarse, coarse_options)); // highest priority

    let key = geo_key(5, 10, 7);
    let mut hf = HeightGrid::filled(17, 17, NO_DATA);
    let ok = stack.populate(&mut hf, None, &key, None, Interpolation::Bilinear, None);

    // The coarse layer wins on priority despite being fallback, and the
    // fine layer's presence keeps the result real.
    assert!(ok);
    assert!(hf.heights().iter().all(|&h| h == 500.0));
}

#[test]
fn msl_policy_resolves_holes_to_sea_level() {
    let source = Arc::new(MemorySource::new("holey"));
    let key = geo_key(1, 0, 0);
    let mut grid = HeightGrid::filled(9, 9, 42.0);
    for c in 0..9 {
        for r in 0..9 {
            if (c + r) % 2 == 0 {
                grid.set(c, r, NO_DATA);
            }
        }
    }
    source.insert(key.clone(), grid);

    let mut options = ElevationLayerOptions::named("holey");
    options.nodata_policy = NoDataPolicy::Msl;
    options.tile_size = 9;

    // Source datum carries a geoid flat at 0; the requester has no
    // vertical datum at all.
    let msl = Arc::new(VerticalDatum::new("msl", Some(Geoid::constant("flat", 0.0))));
    let profile = Arc::new(Profile::global_geodetic().with_vertical_datum(msl));
    let layer: Arc<dyn Layer> = Arc::new(
        ElevationLayer::new(options)
            .with_profile(profile)
            .with_source(source),
    );

    let field = layer.create_height_field(&key, None).unwrap();
    for r in 0..9 {
        for c in 0..9 {
            let h = field.grid().get(c, r);
            assert_ne!(h, NO_DATA);
            let expected = if (c + r) % 2 == 0 { 0.0 } else { 42.0 };
            assert_eq!(h, expected);
        }
    }
}

/// Driver that always fails, counting invocations.
struct CountingFailSource {
    calls: AtomicUsize,
    blacklist: Blacklist,
}

impl CountingFailSource {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            blacklist: Blacklist::new(),
        }
    }
}

impl TileSource for CountingFailSource {
    fn name(&self) -> &str {
        "counting-fail"
    }

    fn create_height_grid(
        &self,
        key: &TileKey,
        _op: Option<&dyn GridOp>,
        _progress: Option<&dyn Progress>,
    ) -> Result<HeightGrid, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Fetch(key.str_key()))
    }

    fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }
}

#[test]
fn hard_failure_blacklists_and_skips_the_driver() {
    let source = Arc::new(CountingFailSource::new());
    let layer = ElevationLayer::new(ElevationLayerOptions::named("flaky"))
        .with_profile(geodetic())
        .with_source(Arc::clone(&source) as Arc<dyn TileSource>);

    let key = geo_key(4, 2, 2);
    assert!(layer.create_height_field(&key, None).is_none());
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    // The second call must observe the blacklist and never reach the
    // driver.
    assert!(layer.create_height_field(&key, None).is_none());
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn cross_profile_request_assembles_intersecting_tiles() {
    // A projected pyramid offset from the global grids: its level-0
    // tile straddles both a geodetic column boundary and the equator.
    let b = MERCATOR_BOUND;
    let custom = Arc::new(Profile::new(
        Srs::spherical_mercator(),
        -b / 4.0,
        -b / 4.0,
        b / 4.0,
        b / 4.0,
        1,
        1,
    ));
    let request = TileKey::new(0, 0, 0, Arc::clone(&custom));

    // Sanity: the request intersects four geodetic tiles.
    let geo_profile = geodetic();
    assert_eq!(geo_profile.intersecting_tiles(&request).len(), 4);

    // Seed only the northwest and southeast quadrants.
    let source = Arc::new(MemorySource::new("quadrants"));
    source.insert(geo_key(1, 1, 0), HeightGrid::filled(9, 9, 111.0));
    source.insert(geo_key(1, 2, 1), HeightGrid::filled(9, 9, 222.0));

    let mut options = ElevationLayerOptions::named("quadrants");
    options.tile_size = 9;
    let layer = ElevationLayer::new(options)
        .with_profile(geo_profile)
        .with_source(source);

    let field = layer.create_height_field(&request, None).unwrap();
    let grid = field.grid();
    assert_eq!(grid.columns(), 9);

    // Row/column 2 and 6 sit well inside each quadrant.
    let nw = grid.get(2, 6);
    let se = grid.get(6, 2);
    let ne = grid.get(6, 6);
    let sw = grid.get(2, 2);
    assert_eq!(nw, 111.0);
    assert_eq!(se, 222.0);
    assert_eq!(ne, NO_DATA);
    assert_eq!(sw, NO_DATA);
}

#[test]
fn populate_twice_yields_identical_results() {
    let source = Arc::new(MemorySource::new("stable"));
    seed_levels(&source, 0..3, 17, 64.0);
    let mut options = ElevationLayerOptions::named("stable");
    options.tile_size = 17;

    let mut stack = LayerStack::new();
    stack.push(layer_over(source, options));

    let key = geo_key(2, 2, 1);
    let run = || {
        let mut hf = HeightGrid::filled(17, 17, NO_DATA);
        let mut nm = NormalMap::new(17, 17);
        stack.populate(
            &mut hf,
            Some(&mut nm),
            &key,
            None,
            Interpolation::Bilinear,
            None,
        );
        (hf, nm)
    };
    assert_eq!(run(), run());
}

#[test]
fn hae_profile_rewrites_the_query_datum() {
    // The layer serves 100m MSL heights over a geoid sitting 30m above
    // the ellipsoid.
    let geoid = Geoid::constant("egm", 30.0);
    let msl = Arc::new(VerticalDatum::new("egm", Some(geoid)));
    let msl_profile = Arc::new(Profile::global_geodetic().with_vertical_datum(msl));

    let source = Arc::new(MemorySource::new("dem"));
    seed_levels(&source, 0..3, 9, 100.0);

    let mut options = ElevationLayerOptions::named("dem");
    options.tile_size = 9;
    let layer: Arc<dyn Layer> = Arc::new(
        ElevationLayer::new(options)
            .with_profile(Arc::clone(&msl_profile))
            .with_source(source),
    );

    let mut stack = LayerStack::new();
    stack.push(layer);

    // Request through the MSL pyramid but demand ellipsoidal heights.
    let key = TileKey::new(2, 1, 1, Arc::clone(&msl_profile));
    let hae_profile = geodetic();

    let mut hf = HeightGrid::filled(9, 9, NO_DATA);
    let ok = stack.populate(
        &mut hf,
        None,
        &key,
        Some(&hae_profile),
        Interpolation::Bilinear,
        None,
    );
    assert!(ok);
    assert!(hf.heights().iter().all(|&h| h == 130.0));
}
