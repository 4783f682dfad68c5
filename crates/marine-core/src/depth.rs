//! Seabed soundings and the bathymetric grid alternative to the spatial store.

use crate::error::StorageError;
use crate::forecast::ForecastCandidate;
use crate::geom::{Point, Polygon, EARTH_RADIUS_M};
use crate::hazards::{is_hazard_depth, HazardSource, SafePoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A seabed sample. Depth is negative below the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthPoint {
    pub location: Point,
    pub depth: f64,
}

/// Raw grid layout as stored on disk: rows run north to south.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthGridData {
    pub ncols: usize,
    pub nrows: usize,
    /// Longitude of the lower-left corner.
    pub xllcorner: f64,
    /// Latitude of the lower-left corner.
    pub yllcorner: f64,
    pub cellsize: f64,
    #[serde(rename = "NODATA_value")]
    pub nodata_value: i32,
    pub rows: Vec<Vec<i32>>,
}

/// Regular lat/lon grid of depth values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DepthGridData", into = "DepthGridData")]
pub struct DepthGrid {
    data: DepthGridData,
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl DepthGrid {
    pub fn new(data: DepthGridData) -> Result<Self, StorageError> {
        if data.ncols == 0 || data.nrows == 0 {
            return Err(StorageError::Decode("depth grid has no cells".into()));
        }
        if !(data.cellsize.is_finite() && data.cellsize > 0.0) {
            return Err(StorageError::Decode(format!(
                "depth grid cellsize must be positive, got {}",
                data.cellsize
            )));
        }
        if data.rows.len() != data.nrows || data.rows.iter().any(|row| row.len() != data.ncols) {
            return Err(StorageError::Decode(format!(
                "depth grid rows do not match {}x{} header",
                data.nrows, data.ncols
            )));
        }

        Ok(Self {
            min_lat: data.yllcorner,
            max_lat: data.yllcorner + data.cellsize * data.nrows as f64,
            min_lon: data.xllcorner,
            max_lon: data.xllcorner + data.cellsize * data.ncols as f64,
            data,
        })
    }

    // Grids stored in 0..360 need western longitudes shifted into range.
    fn grid_lon(&self, lon: f64) -> f64 {
        if self.max_lon > 180.0 && lon < 0.0 {
            lon + 360.0
        } else {
            lon
        }
    }

    fn cell(&self, row: usize, col: usize) -> Option<DepthPoint> {
        // Row 0 is the southernmost, stored last.
        let value = self.data.rows[self.data.nrows - row - 1][col];
        if value == self.data.nodata_value {
            return None;
        }
        let lon = col as f64 * self.data.cellsize + self.min_lon;
        Some(DepthPoint {
            location: Point::new(
                row as f64 * self.data.cellsize + self.min_lat,
                if lon > 180.0 { lon - 360.0 } else { lon },
            ),
            depth: f64::from(value),
        })
    }

    fn index_of(&self, point: &Point) -> Option<(usize, usize)> {
        let lat = point.lat;
        let lon = self.grid_lon(point.lon);
        if lat < self.min_lat || lat >= self.max_lat || lon < self.min_lon || lon >= self.max_lon {
            return None;
        }
        let row = ((lat - self.min_lat) / self.data.cellsize) as usize;
        let col = ((lon - self.min_lon) / self.data.cellsize) as usize;
        (row < self.data.nrows && col < self.data.ncols).then_some((row, col))
    }

    /// Sounding of the cell containing `point`, if any.
    pub fn nearest_depth_point(&self, point: &Point) -> Option<DepthPoint> {
        let (row, col) = self.index_of(point)?;
        self.cell(row, col)
    }

    pub fn depth(&self, point: &Point) -> Option<f64> {
        self.nearest_depth_point(point).map(|p| p.depth)
    }

    /// Every sounding whose cell corner lies in the given box.
    fn cells_in_box(&self, min: Point, max: Point) -> impl Iterator<Item = DepthPoint> + '_ {
        let size = self.data.cellsize;
        let clamp_row = |lat: f64| ((lat - self.min_lat) / size).floor().max(0.0) as usize;
        let clamp_col = |lon: f64| ((lon - self.min_lon) / size).floor().max(0.0) as usize;

        let row_lo = clamp_row(min.lat);
        let row_hi = clamp_row(max.lat).min(self.data.nrows - 1);
        let col_lo = clamp_col(self.grid_lon(min.lon));
        let col_hi = clamp_col(self.grid_lon(max.lon)).min(self.data.ncols - 1);

        (row_lo..=row_hi)
            .flat_map(move |row| (col_lo..=col_hi).map(move |col| (row, col)))
            .filter_map(|(row, col)| self.cell(row, col))
    }

    /// Hazardous soundings within `distance_m` of `center`.
    pub fn hazards_near(&self, center: &Point, threshold: f64, distance_m: f64) -> Vec<DepthPoint> {
        let dlat = (distance_m / EARTH_RADIUS_M).to_degrees();
        let dlon = dlat / center.lat.to_radians().cos().abs().max(1e-6);
        let min = Point::new(center.lat - dlat, center.lon - dlon);
        let max = Point::new(center.lat + dlat, center.lon + dlon);
        self.cells_in_box(min, max)
            .filter(|p| is_hazard_depth(p.depth, threshold))
            .filter(|p| p.location.haversine(center) <= distance_m)
            .collect()
    }

    /// Hazardous soundings inside `polygon`.
    pub fn hazards_in(&self, polygon: &Polygon, threshold: f64) -> Vec<DepthPoint> {
        let Some((min, max)) = polygon.bounding_box() else {
            return Vec::new();
        };
        self.cells_in_box(min, max)
            .filter(|p| is_hazard_depth(p.depth, threshold))
            .filter(|p| polygon.contains(&p.location))
            .collect()
    }
}

impl TryFrom<DepthGridData> for DepthGrid {
    type Error = StorageError;

    fn try_from(data: DepthGridData) -> Result<Self, StorageError> {
        DepthGrid::new(data)
    }
}

impl From<DepthGrid> for DepthGridData {
    fn from(grid: DepthGrid) -> Self {
        grid.data
    }
}

/// Answers depth queries from a loaded grid and forwards forecast queries.
pub struct DepthGridOverlay {
    grid: DepthGrid,
    inner: Arc<dyn HazardSource>,
}

impl DepthGridOverlay {
    pub fn new(grid: DepthGrid, inner: Arc<dyn HazardSource>) -> Self {
        Self { grid, inner }
    }

    pub fn grid(&self) -> &DepthGrid {
        &self.grid
    }
}

impl HazardSource for DepthGridOverlay {
    fn select_closest_forecasts(
        &self,
        points: &[Point],
        max_radius_deg: f64,
        min_date: DateTime<Utc>,
    ) -> Result<Vec<ForecastCandidate>, StorageError> {
        self.inner
            .select_closest_forecasts(points, max_radius_deg, min_date)
    }

    fn select_forecast_location(&self, forecast_id: i64) -> Result<Point, StorageError> {
        self.inner.select_forecast_location(forecast_id)
    }

    fn select_hazard_depth_points(
        &self,
        points: &[Point],
        threshold_depth: f64,
        distance_m: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError> {
        Ok(points
            .iter()
            .map(|p| self.grid.hazards_near(p, threshold_depth, distance_m))
            .collect())
    }

    fn select_hazard_depth_points_in_angle(
        &self,
        triangles: &[Polygon],
        threshold_depth: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError> {
        Ok(triangles
            .iter()
            .map(|t| self.grid.hazards_in(t, threshold_depth))
            .collect())
    }

    fn select_safe_points(&self) -> Result<Vec<SafePoint>, StorageError> {
        self.inner.select_safe_points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryHazardStore;

    // 3x4 grid starting at (lat 10, lon 20) with 1 degree cells.
    fn grid() -> DepthGrid {
        DepthGrid::new(DepthGridData {
            ncols: 4,
            nrows: 3,
            xllcorner: 20.0,
            yllcorner: 10.0,
            cellsize: 1.0,
            nodata_value: -9999,
            rows: vec![
                vec![-100, -100, -3, -100],
                vec![-100, -9999, -100, -100],
                vec![-50, -100, -100, 5],
            ],
        })
        .unwrap()
    }

    #[test]
    fn nearest_uses_south_up_rows() {
        let g = grid();
        let south_west = g.nearest_depth_point(&Point::new(10.5, 20.5)).unwrap();
        assert_eq!(south_west.depth, -50.0);
        assert_eq!(south_west.location, Point::new(10.0, 20.0));
        assert_eq!(g.depth(&Point::new(12.2, 22.9)), Some(-3.0));
    }

    #[test]
    fn outside_and_nodata_cells_have_no_depth() {
        let g = grid();
        assert!(g.nearest_depth_point(&Point::new(9.9, 20.5)).is_none());
        assert!(g.nearest_depth_point(&Point::new(10.5, 24.0)).is_none());
        assert!(g.nearest_depth_point(&Point::new(11.5, 21.5)).is_none());
    }

    #[test]
    fn western_longitudes_wrap_into_360_grids() {
        let g = DepthGrid::new(DepthGridData {
            ncols: 2,
            nrows: 1,
            xllcorner: 179.0,
            yllcorner: 0.0,
            cellsize: 1.0,
            nodata_value: -9999,
            rows: vec![vec![-10, -20]],
        })
        .unwrap();
        let p = g.nearest_depth_point(&Point::new(0.5, -179.5)).unwrap();
        assert_eq!(p.depth, -20.0);
        assert_eq!(p.location.lon, 180.0);
    }

    #[test]
    fn rejects_mismatched_rows() {
        let err = DepthGrid::new(DepthGridData {
            ncols: 2,
            nrows: 2,
            xllcorner: 0.0,
            yllcorner: 0.0,
            cellsize: 1.0,
            nodata_value: -1,
            rows: vec![vec![1, 2]],
        })
        .unwrap_err();
        assert!(matches!(err, StorageError::Decode(_)));
    }

    #[test]
    fn overlay_answers_triangle_queries_from_grid() {
        let overlay = DepthGridOverlay::new(grid(), Arc::new(MemoryHazardStore::default()));
        let triangle = Polygon::new(vec![
            Point::new(12.0, 21.5),
            Point::new(12.0, 23.5),
            Point::new(11.0, 22.5),
        ]);
        let hits = overlay
            .select_hazard_depth_points_in_angle(&[triangle], 6.0)
            .unwrap();
        assert_eq!(hits.len(), 1);
        let depths: Vec<f64> = hits[0].iter().map(|p| p.depth).collect();
        assert_eq!(depths, vec![-3.0]);
    }

    #[test]
    fn overlay_radius_query_includes_land_cells() {
        let overlay = DepthGridOverlay::new(grid(), Arc::new(MemoryHazardStore::default()));
        let hits = overlay
            .select_hazard_depth_points(&[Point::new(10.0, 23.0)], 6.0, 1_000.0)
            .unwrap();
        assert_eq!(hits[0].len(), 1);
        assert_eq!(hits[0][0].depth, 5.0);
    }
}
