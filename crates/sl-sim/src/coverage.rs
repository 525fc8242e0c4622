//! Sensor coverage analysis on a latitude/longitude grid
//!
//! Row 0 of a coverage grid is the south pole, column 0 the prime meridian.
//! Statistics are weighted by cell area, which shrinks toward the poles.

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COVERAGE_RADIUS_KM, KM_PER_DEGREE_LAT};
use crate::coordinates::{km_per_degree_lon_internal, standard_to_internal};

/// Summary of a coverage grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub coverage_percentage: f64,
    pub total_cells: usize,
    pub covered_cells: usize,
    pub uncovered_cells: usize,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub mean_value: Option<f64>,
}

/// Computes which grid cells fall within sensor range of balloons
#[derive(Debug, Clone)]
pub struct CoverageAnalyzer {
    radius_km: f64,
    grid_height: usize,
    grid_width: usize,
    area_grid: Array2<f64>,
}

impl Default for CoverageAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_COVERAGE_RADIUS_KM, 180, 360)
    }
}

impl CoverageAnalyzer {
    pub fn new(radius_km: f64, grid_height: usize, grid_width: usize) -> Self {
        let grid_height = grid_height.max(1);
        let grid_width = grid_width.max(1);
        Self {
            radius_km,
            grid_height,
            grid_width,
            area_grid: area_grid(grid_height, grid_width),
        }
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.grid_height, self.grid_width)
    }

    /// Cell areas in km², indexed like a coverage grid
    pub fn area_grid(&self) -> &Array2<f64> {
        &self.area_grid
    }

    /// An empty coverage grid
    pub fn create_grid(&self) -> Array2<f64> {
        Array2::zeros((self.grid_height, self.grid_width))
    }

    /// Mark every cell within range of a balloon at `(lat, lon)` with `value`.
    ///
    /// Latitude rows are clamped, longitude columns wrap across the
    /// antimeridian. A box reaching past a pole, or spanning half the globe in
    /// longitude, covers every longitude in its rows.
    pub fn update_coverage(&self, lat: f64, lon: f64, grid: &mut Array2<f64>, value: f64) {
        let (lat, lon) = standard_to_internal(lat, lon);
        let lat_degrees = self.radius_km / KM_PER_DEGREE_LAT;
        let lon_degrees = self.radius_km / km_per_degree_lon_internal(lat).max(f64::EPSILON);

        let min_lat = lat - lat_degrees;
        let max_lat = lat + lat_degrees;
        let min_y = self.row(min_lat);
        let max_y = self.row(max_lat);

        if min_lat < 0.0 || max_lat > 180.0 || lon_degrees >= 180.0 {
            grid.slice_mut(s![min_y..max_y + 1, ..]).fill(value);
            return;
        }

        let min_x = self.column((lon - lon_degrees).rem_euclid(360.0));
        let max_x = self.column((lon + lon_degrees).rem_euclid(360.0));

        if min_x <= max_x {
            grid.slice_mut(s![min_y..max_y + 1, min_x..max_x + 1])
                .fill(value);
        } else {
            grid.slice_mut(s![min_y..max_y + 1, min_x..]).fill(value);
            grid.slice_mut(s![min_y..max_y + 1, ..max_x + 1]).fill(value);
        }
    }

    /// Area-weighted fraction (0..=1) of cells with any coverage
    pub fn coverage_fraction(&self, grid: &Array2<f64>) -> f64 {
        self.weighted_fraction(grid, |v| v != 0.0)
    }

    /// Area-weighted fraction of cells whose value exceeds `threshold`,
    /// e.g. "covered within the last N steps"
    pub fn coverage_fraction_above(&self, grid: &Array2<f64>, threshold: f64) -> f64 {
        self.weighted_fraction(grid, |v| v > threshold)
    }

    pub fn statistics(&self, grid: &Array2<f64>) -> CoverageStats {
        let covered: Vec<f64> = grid.iter().copied().filter(|v| *v != 0.0).collect();
        let total_cells = grid.len();

        let (min_value, max_value, mean_value) = if covered.is_empty() {
            (None, None, None)
        } else {
            let min = covered.iter().copied().fold(f64::INFINITY, f64::min);
            let max = covered.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = covered.iter().sum::<f64>() / covered.len() as f64;
            (Some(min), Some(max), Some(mean))
        };

        CoverageStats {
            coverage_percentage: self.coverage_fraction(grid) * 100.0,
            total_cells,
            covered_cells: covered.len(),
            uncovered_cells: total_cells - covered.len(),
            min_value,
            max_value,
            mean_value,
        }
    }

    fn weighted_fraction(&self, grid: &Array2<f64>, covered: impl Fn(f64) -> bool) -> f64 {
        let total: f64 = self.area_grid.sum();
        if total <= 0.0 {
            return 0.0;
        }
        let covered_area: f64 = grid
            .iter()
            .zip(self.area_grid.iter())
            .filter(|(v, _)| covered(**v))
            .map(|(_, area)| *area)
            .sum();
        covered_area / total
    }

    fn row(&self, internal_lat: f64) -> usize {
        let max_y = (self.grid_height - 1) as f64;
        (max_y * internal_lat / 180.0).round().clamp(0.0, max_y) as usize
    }

    fn column(&self, internal_lon: f64) -> usize {
        let width = self.grid_width as i64;
        ((self.grid_width as f64 * internal_lon / 360.0).round() as i64).rem_euclid(width) as usize
    }
}

/// Cell areas in km², evaluated at each row's centre latitude
fn area_grid(grid_height: usize, grid_width: usize) -> Array2<f64> {
    let lat_per_cell = 180.0 / grid_height as f64;
    let lon_per_cell = 360.0 / grid_width as f64;
    let height_km = lat_per_cell * KM_PER_DEGREE_LAT;

    Array2::from_shape_fn((grid_height, grid_width), |(y, _)| {
        let lat = (y as f64 + 0.5) * lat_per_cell - 90.0;
        let width_km = lon_per_cell * KM_PER_DEGREE_LAT * lat.to_radians().cos();
        width_km * height_km
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Axis;

    #[test]
    fn create_grid_is_empty() {
        let analyzer = CoverageAnalyzer::new(370.0, 180, 360);
        let grid = analyzer.create_grid();
        assert_eq!(grid.dim(), (180, 360));
        assert!(grid.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn update_marks_cells_with_value() {
        let analyzer = CoverageAnalyzer::new(100.0, 180, 360);
        let mut grid = analyzer.create_grid();
        analyzer.update_coverage(0.0, 0.0, &mut grid, 1.0);
        assert!(grid.iter().any(|v| *v != 0.0));
        assert_eq!(grid.iter().copied().fold(0.0, f64::max), 1.0);
    }

    #[test]
    fn empty_and_full_grids() {
        let analyzer = CoverageAnalyzer::default();
        let mut grid = analyzer.create_grid();
        assert_eq!(analyzer.coverage_fraction(&grid), 0.0);
        grid.fill(1.0);
        assert!((analyzer.coverage_fraction(&grid) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn coverage_wraps_at_antimeridian() {
        let analyzer = CoverageAnalyzer::new(500.0, 180, 360);
        let mut grid = analyzer.create_grid();
        analyzer.update_coverage(0.0, -179.0, &mut grid, 1.0);

        // -179 is internal 181, so that box stays contiguous around column
        // 180; a box at 2 degrees east straddles the wrap at column 0/359
        let mut wrapped = analyzer.create_grid();
        analyzer.update_coverage(0.0, 2.0, &mut wrapped, 1.0);
        assert!(wrapped.slice(s![.., 355..]).iter().any(|v| *v != 0.0));
        assert!(wrapped.slice(s![.., ..5]).iter().any(|v| *v != 0.0));
        assert!(grid.slice(s![.., 175..185]).iter().any(|v| *v != 0.0));
    }

    #[test]
    fn coverage_is_centred_on_equator() {
        let analyzer = CoverageAnalyzer::new(300.0, 180, 360);
        let mut grid = analyzer.create_grid();
        analyzer.update_coverage(0.0, 0.0, &mut grid, 1.0);

        let rows: Vec<usize> = grid
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, row)| row.iter().any(|v| *v != 0.0))
            .map(|(y, _)| y)
            .collect();
        let centre = rows.iter().sum::<usize>() as f64 / rows.len() as f64;
        assert!((centre - 90.0).abs() < 5.0);
    }

    fn covered_columns(grid: &Array2<f64>) -> usize {
        grid.axis_iter(Axis(1))
            .filter(|col| col.iter().any(|v| *v != 0.0))
            .count()
    }

    #[test]
    fn coverage_widens_toward_poles() {
        let analyzer = CoverageAnalyzer::new(500.0, 180, 360);
        let mut equator = analyzer.create_grid();
        analyzer.update_coverage(0.0, 0.0, &mut equator, 1.0);
        let mut polar = analyzer.create_grid();
        analyzer.update_coverage(70.0, 0.0, &mut polar, 1.0);
        assert!(covered_columns(&polar) > covered_columns(&equator));
    }

    #[test]
    fn box_past_pole_covers_all_longitudes() {
        let analyzer = CoverageAnalyzer::new(500.0, 180, 360);
        let mut grid = analyzer.create_grid();
        analyzer.update_coverage(88.0, 10.0, &mut grid, 1.0);
        assert_eq!(covered_columns(&grid), 360);
        assert!(grid.row(179).iter().all(|v| *v == 1.0));
        assert!(grid.row(0).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn statistics_report_values() {
        let analyzer = CoverageAnalyzer::default();
        let mut grid = analyzer.create_grid();
        analyzer.update_coverage(40.0, -100.0, &mut grid, 5.0);

        let stats = analyzer.statistics(&grid);
        assert_eq!(stats.total_cells, 180 * 360);
        assert_eq!(stats.covered_cells + stats.uncovered_cells, stats.total_cells);
        assert!(stats.coverage_percentage > 0.0);
        assert_eq!(stats.min_value, Some(5.0));
        assert_eq!(stats.max_value, Some(5.0));
        assert_eq!(stats.mean_value, Some(5.0));
    }

    #[test]
    fn statistics_of_empty_grid_have_no_values() {
        let analyzer = CoverageAnalyzer::default();
        let stats = analyzer.statistics(&analyzer.create_grid());
        assert_eq!(stats.covered_cells, 0);
        assert_eq!(stats.min_value, None);
        assert_eq!(stats.mean_value, None);
    }

    #[test]
    fn threshold_filters_older_coverage() {
        let analyzer = CoverageAnalyzer::default();
        let mut grid = analyzer.create_grid();
        analyzer.update_coverage(0.0, 0.0, &mut grid, 10.0);
        analyzer.update_coverage(0.0, 90.0, &mut grid, 5.0);
        analyzer.update_coverage(0.0, -90.0, &mut grid, 1.0);

        let all = analyzer.coverage_fraction_above(&grid, 0.0);
        let recent = analyzer.coverage_fraction_above(&grid, 7.0);
        assert!(recent > 0.0);
        assert!(recent < all);
    }

    #[test]
    fn polar_cells_are_smaller() {
        let analyzer = CoverageAnalyzer::new(370.0, 180, 360);
        assert!(analyzer.area_grid()[[0, 0]] < analyzer.area_grid()[[90, 0]]);
    }

    #[test]
    fn equatorial_cells_weigh_more() {
        let analyzer = CoverageAnalyzer::new(370.0, 180, 360);
        let mut equator = analyzer.create_grid();
        equator.slice_mut(s![85..95, 0..10]).fill(1.0);
        let mut polar = analyzer.create_grid();
        polar.slice_mut(s![0..10, 0..10]).fill(1.0);
        assert!(analyzer.coverage_fraction(&equator) > analyzer.coverage_fraction(&polar));
    }

    #[test]
    fn overlapping_updates_keep_area_and_take_latest_value() {
        let analyzer = CoverageAnalyzer::new(500.0, 180, 360);
        let mut grid = analyzer.create_grid();
        analyzer.update_coverage(0.0, 0.0, &mut grid, 1.0);
        let first = analyzer.coverage_fraction(&grid);
        analyzer.update_coverage(0.0, 0.0, &mut grid, 2.0);
        assert!((analyzer.coverage_fraction(&grid) - first).abs() < 1e-3);
        assert_eq!(grid.iter().copied().fold(0.0, f64::max), 2.0);
    }

    #[test]
    fn separate_updates_accumulate() {
        let analyzer = CoverageAnalyzer::new(300.0, 180, 360);
        let mut grid = analyzer.create_grid();
        analyzer.update_coverage(0.0, 0.0, &mut grid, 1.0);
        let first = analyzer.coverage_fraction(&grid);
        analyzer.update_coverage(0.0, 90.0, &mut grid, 1.0);
        assert!(analyzer.coverage_fraction(&grid) > first);
    }
}
