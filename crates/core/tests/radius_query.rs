//! Radius search against a brute-force scan.
//!
//! For random points and random caps the index must return exactly the points
//! a linear chord-distance filter returns, with both store backends.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use s2_tiles_core::{ChordAngle, FileVector, PointIndex, S2Point, VectorStore};

const POINTS: usize = 2000;
const QUERIES: usize = 60;

fn random_point(rng: &mut StdRng) -> S2Point {
    let lon: f64 = rng.random_range(-180.0..180.0);
    let lat = rng.random_range(-1.0f64..1.0).asin().to_degrees();
    S2Point::from_lon_lat(lon, lat)
}

/// Radii from sub-metre up to a hemisphere.
fn random_radius(rng: &mut StdRng) -> ChordAngle {
    let exponent: f64 = rng.random_range(-6.0..2.3);
    ChordAngle::from_degrees(10f64.powf(exponent))
}

fn brute_force(points: &[S2Point], target: &S2Point, radius: ChordAngle) -> BTreeSet<u32> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| ChordAngle::from_points(target, p) < radius)
        .map(|(k, _)| k as u32)
        .collect()
}

fn check_index<S>(index: &mut PointIndex<u32, S>, points: &[S2Point], seed: u64)
where
    S: VectorStore<s2_tiles_core::PointShape<u32>>,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let mut total = 0usize;
    for query in 0..QUERIES {
        // Half the queries are centred on an indexed point.
        let target = if query % 2 == 0 {
            points[rng.random_range(0..points.len())]
        } else {
            random_point(&mut rng)
        };
        let radius = random_radius(&mut rng);

        let found: BTreeSet<u32> = index
            .search_radius(target, radius)
            .unwrap()
            .into_iter()
            .map(|shape| shape.data)
            .collect();
        let expected = brute_force(points, &target, radius);
        assert_eq!(
            found,
            expected,
            "query {} at {:?} with radius {} degrees",
            query,
            target.to_lon_lat(),
            radius.degrees()
        );
        total += found.len();
    }
    // Make sure the queries were not all trivially empty.
    assert!(total > 0);
}

#[test]
fn test_radius_matches_brute_force_in_memory() {
    let mut rng = StdRng::seed_from_u64(42);
    let points: Vec<S2Point> = (0..POINTS).map(|_| random_point(&mut rng)).collect();

    let mut index = PointIndex::new();
    index
        .insert_points(points.iter().enumerate().map(|(k, p)| (*p, k as u32)))
        .unwrap();
    check_index(&mut index, &points, 1);
}

#[test]
fn test_radius_matches_brute_force_on_disk() {
    let mut rng = StdRng::seed_from_u64(43);
    let points: Vec<S2Point> = (0..POINTS / 4).map(|_| random_point(&mut rng)).collect();

    let dir = tempfile::tempdir().unwrap();
    let store = FileVector::new_in(dir.path()).unwrap().with_segment_size(128);
    let mut index = PointIndex::with_store(store);
    index
        .insert_points(points.iter().enumerate().map(|(k, p)| (*p, k as u32)))
        .unwrap();
    check_index(&mut index, &points, 2);
    index.close().unwrap();
}

#[test]
fn test_clustered_points() {
    // Dense cluster around a cube corner, where covering cells span faces.
    let mut rng = StdRng::seed_from_u64(44);
    let corner = S2Point::new(1.0, 1.0, 1.0).normalize();
    let points: Vec<S2Point> = (0..500)
        .map(|_| {
            let jitter = S2Point::new(
                rng.random_range(-0.01..0.01),
                rng.random_range(-0.01..0.01),
                rng.random_range(-0.01..0.01),
            );
            (corner + jitter).normalize()
        })
        .collect();

    let mut index = PointIndex::new();
    for (k, p) in points.iter().enumerate() {
        index.insert(*p, k as u32).unwrap();
    }

    for degrees in [0.01, 0.1, 0.5, 1.0, 5.0] {
        let radius = ChordAngle::from_degrees(degrees);
        let found: BTreeSet<u32> = index
            .search_radius(corner, radius)
            .unwrap()
            .into_iter()
            .map(|s| s.data)
            .collect();
        assert_eq!(found, brute_force(&points, &corner, radius), "{} degrees", degrees);
    }
}

#[test]
fn test_search_range_matches_scan() {
    let mut rng = StdRng::seed_from_u64(45);
    let points: Vec<S2Point> = (0..500).map(|_| random_point(&mut rng)).collect();
    let mut index = PointIndex::new();
    index
        .insert_points(points.iter().enumerate().map(|(k, p)| (*p, k as u32)))
        .unwrap();

    let values = index.values().unwrap();
    for _ in 0..50 {
        let a = values[rng.random_range(0..values.len())].cell;
        let b = values[rng.random_range(0..values.len())].cell;
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let found: Vec<u32> = index
            .search_range(low, high)
            .unwrap()
            .into_iter()
            .map(|s| s.data)
            .collect();
        let expected: Vec<u32> = values
            .iter()
            .filter(|s| s.cell >= low && s.cell <= high)
            .map(|s| s.data)
            .collect();
        assert_eq!(found, expected);
    }
}
