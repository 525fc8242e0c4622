#[cfg(not(miri))] // Skip property tests under miri as they're too slow
use proptest::prelude::*;
#[cfg(not(miri))]
use sl_sim::coordinates::{internal_to_standard, standard_to_grid, standard_to_internal};
#[cfg(not(miri))]
use sl_sim::{CoverageAnalyzer, TrajectoryComputer, WindField};

#[cfg(not(miri))]
proptest! {
    #[test]
    fn test_standard_internal_round_trip(lat in -90.0f64..=90.0, lon in -179.999f64..180.0) {
        let (ilat, ilon) = standard_to_internal(lat, lon);
        prop_assert!((0.0..=180.0).contains(&ilat));
        prop_assert!((0.0..360.0).contains(&ilon));

        let (rlat, rlon) = internal_to_standard(ilat, ilon);
        prop_assert!((rlat - lat).abs() < 1e-9);
        prop_assert!((rlon - lon).abs() < 1e-9);
    }

    #[test]
    fn test_grid_indices_in_bounds(
        lat in -90.0f64..=90.0,
        lon in -180.0f64..=180.0,
        height in 2usize..200,
        width in 1usize..400,
    ) {
        let (y, x) = standard_to_grid(lat, lon, height, width);
        prop_assert!(y < height);
        prop_assert!(x < width);
    }

    #[test]
    fn test_trajectory_stays_on_globe(
        lat in -90.0f64..=90.0,
        lon in -180.0f64..180.0,
        u_ms in -60.0f64..60.0,
        v_ms in -60.0f64..60.0,
    ) {
        let wind = WindField::uniform(u_ms, v_ms, 73, 144, 1);
        let points = TrajectoryComputer::new(&wind).compute_trajectory(lat, lon, 48, 0);
        prop_assert_eq!(points.len(), 49);
        for p in points {
            prop_assert!(p.lat.is_finite() && p.lon.is_finite());
            prop_assert!((-90.0..=90.0).contains(&p.lat), "lat {}", p.lat);
            prop_assert!((-180.0..=180.0).contains(&p.lon), "lon {}", p.lon);
        }
    }

    #[test]
    fn test_coverage_fraction_bounded_and_monotone(
        points in prop::collection::vec((-90.0f64..=90.0, -180.0f64..=180.0), 1..8),
    ) {
        let analyzer = CoverageAnalyzer::default();
        let mut grid = analyzer.create_grid();
        let mut previous = 0.0;
        for (lat, lon) in points {
            analyzer.update_coverage(lat, lon, &mut grid, 1.0);
            let fraction = analyzer.coverage_fraction(&grid);
            prop_assert!((0.0..=1.0 + 1e-12).contains(&fraction));
            prop_assert!(fraction >= previous);
            prop_assert!(fraction > 0.0);
            previous = fraction;
        }
    }
}
