//! In-memory hazard store loaded from a JSON snapshot.
//!
//! Snapshot locations are WKT strings (`POINT(lon lat)`), matching what the
//! spatial store exports.

use crate::depth::{DepthGrid, DepthGridOverlay, DepthPoint};
use crate::error::StorageError;
use crate::forecast::{ForecastCandidate, ForecastPoint};
use crate::geom::{self, Point, Polygon};
use crate::hazards::{is_hazard_depth, HazardSource, SafePoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Forecast locations closer than this (degrees) are the same site.
const SAME_SITE_DEG: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub forecast_id: i64,
    #[serde(with = "geom::wkt")]
    pub location: Point,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub wave_height_m: Option<f64>,
    #[serde(default)]
    pub swell_height_m: Option<f64>,
}

impl From<ForecastRecord> for ForecastPoint {
    fn from(record: ForecastRecord) -> Self {
        ForecastPoint {
            forecast_id: record.forecast_id,
            location: record.location,
            valid_from: record.valid_from,
            valid_until: record.valid_until,
            wave_height_m: record.wave_height_m,
            swell_height_m: record.swell_height_m,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthRecord {
    #[serde(with = "geom::wkt")]
    pub location: Point,
    pub depth: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafePointRecord {
    #[serde(with = "geom::wkt")]
    pub point: Point,
    pub name: String,
}

impl From<SafePointRecord> for SafePoint {
    fn from(record: SafePointRecord) -> Self {
        SafePoint {
            point: record.point,
            name: record.name,
        }
    }
}

/// Serialized hazard data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HazardSnapshot {
    #[serde(default)]
    pub forecasts: Vec<ForecastRecord>,
    #[serde(default)]
    pub depths: Vec<DepthRecord>,
    /// Bathymetric grid replacing the point soundings for depth queries.
    #[serde(default)]
    pub depth_grid: Option<DepthGrid>,
    #[serde(default)]
    pub safe_points: Vec<SafePointRecord>,
}

impl HazardSnapshot {
    pub fn from_json_str(raw: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Build the hazard source this snapshot describes.
    pub fn into_source(self) -> Arc<dyn HazardSource> {
        let HazardSnapshot {
            forecasts,
            depths,
            depth_grid,
            safe_points,
        } = self;
        let store = Arc::new(MemoryHazardStore::new(HazardSnapshot {
            forecasts,
            depths,
            depth_grid: None,
            safe_points,
        }));
        match depth_grid {
            Some(grid) => Arc::new(DepthGridOverlay::new(grid, store)),
            None => store,
        }
    }
}

/// Linear-scan implementation of [`HazardSource`].
#[derive(Debug, Clone, Default)]
pub struct MemoryHazardStore {
    forecasts: Vec<ForecastPoint>,
    depths: Vec<DepthPoint>,
    safe_points: Vec<SafePoint>,
}

impl MemoryHazardStore {
    pub fn new(snapshot: HazardSnapshot) -> Self {
        tracing::info!(
            "Loaded hazard snapshot: {} forecasts, {} depth points, {} safe points",
            snapshot.forecasts.len(),
            snapshot.depths.len(),
            snapshot.safe_points.len()
        );
        Self {
            forecasts: snapshot.forecasts.into_iter().map(Into::into).collect(),
            depths: snapshot
                .depths
                .into_iter()
                .map(|record| DepthPoint {
                    location: record.location,
                    depth: record.depth,
                })
                .collect(),
            safe_points: snapshot.safe_points.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_safe_point(mut self, point: Point, name: impl Into<String>) -> Self {
        self.safe_points.push(SafePoint {
            point,
            name: name.into(),
        });
        self
    }

    pub fn with_forecast(mut self, forecast: ForecastPoint) -> Self {
        self.forecasts.push(forecast);
        self
    }

    pub fn with_depth(mut self, location: Point, depth: f64) -> Self {
        self.depths.push(DepthPoint { location, depth });
        self
    }

    /// Forecasts at the nearest site within `radius` of `point`.
    fn closest_site(
        &self,
        point: &Point,
        radius: f64,
        min_date: DateTime<Utc>,
    ) -> Vec<(&ForecastPoint, f64)> {
        let in_range: Vec<(&ForecastPoint, f64)> = self
            .forecasts
            .iter()
            .filter(|f| f.valid_until >= min_date)
            .map(|f| (f, (f.location - *point).norm()))
            .filter(|(_, distance)| *distance <= radius)
            .collect();

        let Some(nearest) = in_range
            .iter()
            .map(|(f, d)| (f.location, *d))
            .min_by(|a, b| a.1.total_cmp(&b.1))
        else {
            return Vec::new();
        };
        in_range
            .into_iter()
            .filter(|(f, _)| (f.location - nearest.0).norm() <= SAME_SITE_DEG)
            .collect()
    }
}

impl HazardSource for MemoryHazardStore {
    fn select_closest_forecasts(
        &self,
        points: &[Point],
        max_radius_deg: f64,
        min_date: DateTime<Utc>,
    ) -> Result<Vec<ForecastCandidate>, StorageError> {
        let mut candidates = Vec::new();
        for (point_index, point) in points.iter().enumerate() {
            for (forecast, distance) in self.closest_site(point, max_radius_deg, min_date) {
                candidates.push(ForecastCandidate {
                    forecast: forecast.clone(),
                    distance,
                    point_index,
                });
            }
        }
        Ok(candidates)
    }

    fn select_forecast_location(&self, forecast_id: i64) -> Result<Point, StorageError> {
        self.forecasts
            .iter()
            .find(|f| f.forecast_id == forecast_id)
            .map(|f| f.location)
            .ok_or(StorageError::UnknownForecast(forecast_id))
    }

    fn select_hazard_depth_points(
        &self,
        points: &[Point],
        threshold_depth: f64,
        distance_m: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError> {
        Ok(points
            .iter()
            .map(|point| {
                self.depths
                    .iter()
                    .filter(|d| is_hazard_depth(d.depth, threshold_depth))
                    .filter(|d| d.location.haversine(point) <= distance_m)
                    .copied()
                    .collect()
            })
            .collect())
    }

    fn select_hazard_depth_points_in_angle(
        &self,
        triangles: &[Polygon],
        threshold_depth: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError> {
        for triangle in triangles {
            triangle
                .validate()
                .map_err(|err| StorageError::Backend(err.to_string()))?;
        }
        Ok(triangles
            .iter()
            .map(|triangle| {
                self.depths
                    .iter()
                    .filter(|d| is_hazard_depth(d.depth, threshold_depth))
                    .filter(|d| triangle.contains(&d.location))
                    .copied()
                    .collect()
            })
            .collect())
    }

    fn select_safe_points(&self) -> Result<Vec<SafePoint>, StorageError> {
        Ok(self.safe_points.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn snapshot_json() -> &'static str {
        r#"{
            "forecasts": [
                {"forecast_id": 1, "location": "POINT(37.0 44.0)",
                 "valid_from": "2024-06-01T00:00:00Z", "valid_until": "2024-06-01T03:00:00Z",
                 "wave_height_m": 1.5, "swell_height_m": 0.5},
                {"forecast_id": 2, "location": "POINT(37.0 44.0)",
                 "valid_from": "2024-06-01T03:00:00Z", "valid_until": "2024-06-01T06:00:00Z",
                 "wave_height_m": 2.0},
                {"forecast_id": 3, "location": "POINT(37.05 44.0)",
                 "valid_from": "2024-06-01T00:00:00Z", "valid_until": "2024-06-01T03:00:00Z",
                 "wave_height_m": 9.0},
                {"forecast_id": 4, "location": "POINT(37.0 44.0)",
                 "valid_from": "2024-05-30T00:00:00Z", "valid_until": "2024-05-30T03:00:00Z",
                 "wave_height_m": 4.0}
            ],
            "depths": [
                {"location": "POINT(37.2 44.0)", "depth": -3.0},
                {"location": "POINT(37.3 44.0)", "depth": -40.0}
            ],
            "safe_points": [
                {"point": "POINT(37.5 44.2)", "name": "Novorossiysk roads"}
            ]
        }"#
    }

    fn store() -> MemoryHazardStore {
        MemoryHazardStore::new(HazardSnapshot::from_json_str(snapshot_json()).unwrap())
    }

    #[test]
    fn closest_forecasts_keep_only_the_nearest_site() {
        let candidates = store()
            .select_closest_forecasts(&[Point::new(44.0, 37.01)], 0.1, t0())
            .unwrap();
        let mut ids: Vec<i64> = candidates.iter().map(|c| c.forecast.forecast_id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
        assert!(candidates.iter().all(|c| c.point_index == 0));
    }

    #[test]
    fn closest_forecasts_respect_radius_and_min_date() {
        let store = store();
        let far = store
            .select_closest_forecasts(&[Point::new(45.0, 37.0)], 0.1, t0())
            .unwrap();
        assert!(far.is_empty());

        let late = store
            .select_closest_forecasts(&[Point::new(44.0, 37.0)], 0.1, t0() + Duration::hours(4))
            .unwrap();
        let ids: Vec<i64> = late.iter().map(|c| c.forecast.forecast_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn forecast_location_by_id() {
        let store = store();
        assert_eq!(
            store.select_forecast_location(3).unwrap(),
            Point::new(44.0, 37.05)
        );
        assert!(matches!(
            store.select_forecast_location(99),
            Err(StorageError::UnknownForecast(99))
        ));
    }

    #[test]
    fn depth_radius_query_filters_by_draft() {
        let hits = store()
            .select_hazard_depth_points(&[Point::new(44.0, 37.25)], 5.0, 10_000.0)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].len(), 1);
        assert_eq!(hits[0][0].depth, -3.0);
    }

    #[test]
    fn degenerate_triangle_is_rejected() {
        let err = store()
            .select_hazard_depth_points_in_angle(&[Polygon::new(vec![Point::new(0.0, 0.0)])], 5.0)
            .unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }

    #[test]
    fn malformed_wkt_fails_to_decode() {
        let err = HazardSnapshot::from_json_str(
            r#"{"depths":[{"location":"POINT(oops)","depth":-1.0}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::Decode(_)));
    }

    #[test]
    fn snapshot_with_grid_becomes_overlay() {
        let raw = r#"{
            "depths": [{"location": "POINT(0.5 0.5)", "depth": -100.0}],
            "depth_grid": {"ncols": 1, "nrows": 1, "xllcorner": 0.0, "yllcorner": 0.0,
                           "cellsize": 1.0, "NODATA_value": -9999, "rows": [[-2]]}
        }"#;
        let source = HazardSnapshot::from_json_str(raw).unwrap().into_source();
        let hits = source
            .select_hazard_depth_points(&[Point::new(0.0, 0.0)], 5.0, 1_000.0)
            .unwrap();
        assert_eq!(hits[0].len(), 1);
        assert_eq!(hits[0][0].depth, -2.0);
    }

    #[test]
    fn safe_points_are_listed_in_snapshot_order() {
        let points = store().select_safe_points().unwrap();
        assert_eq!(
            points,
            vec![SafePoint {
                point: Point::new(44.2, 37.5),
                name: "Novorossiysk roads".to_string(),
            }]
        );

        let empty = MemoryHazardStore::default().select_safe_points().unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn depth_grid_snapshot_keeps_safe_points() {
        let source = HazardSnapshot::from_json_str(
            r#"{"safe_points":[{"point":"POINT(10.0 20.0)","name":"Harbour"}],
                "depth_grid":{"ncols":1,"nrows":1,"xllcorner":0.0,"yllcorner":0.0,
                              "cellsize":1.0,"NODATA_value":-32767,"rows":[[-10]]}}"#,
        )
        .unwrap()
        .into_source();
        let points = source.select_safe_points().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, "Harbour");
        assert_eq!(points[0].point, Point::new(20.0, 10.0));
    }
}
