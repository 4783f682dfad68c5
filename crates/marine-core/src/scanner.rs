//! Route scanner: propagates expected arrival times along a route and flags
//! wave and depth hazards.
//!
//! The scanner keeps one piece of shared state (path data, visibility flag,
//! last diagnostic and samples) behind a single mutex. Every accessor holds
//! the lock for its whole duration, including a full [`RouteScanner::cross_detect`].

use crate::diagnostic::{
    collapse_hazards, make_depth_hazard, make_high_waves_hazard, DiagnosticHazardPoint,
    RouteValidateDiagnostic,
};
use crate::error::{Error, Result, StorageError};
use crate::forecast::{ForecastAccessor, ForecastPoint};
use crate::geom::Point;
use crate::hazards::{steering_cone_triangles, HazardSource};
use crate::route::{Route, RoutePoint};
use crate::settings::ScanSettings;
use crate::ship::{arrival_after, calculate_steering_angle, get_speed, ShipPerformanceInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Everything needed to scan one voyage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathData {
    pub route: Route,
    pub ship: ShipPerformanceInfo,
    pub depart_time: DateTime<Utc>,
}

/// A route position annotated with the propagated arrival estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSample {
    pub route_point: RoutePoint,
    pub expected_time: DateTime<Utc>,
    pub speed_mps: f64,
    /// Forecast in effect here. Interpolated samples reuse the last one found.
    pub forecast: Option<ForecastPoint>,
    /// Inserted between coarse samples; never queried for its own forecast.
    pub interpolated: bool,
}

/// Result of a scan before it is stored.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub diagnostic: RouteValidateDiagnostic,
    pub samples: Vec<RouteSample>,
}

#[derive(Debug, Default)]
struct ScanState {
    path: Option<PathData>,
    show: bool,
    diagnostic: Option<RouteValidateDiagnostic>,
    samples: Vec<RouteSample>,
}

pub struct RouteScanner {
    hazards: Arc<dyn HazardSource>,
    settings: ScanSettings,
    state: Mutex<ScanState>,
}

impl RouteScanner {
    pub fn new(hazards: Arc<dyn HazardSource>, settings: ScanSettings) -> Self {
        Self {
            hazards,
            settings,
            state: Mutex::new(ScanState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_path_data(&self, path: PathData) {
        self.state().path = Some(path);
    }

    pub fn path_data(&self) -> Option<PathData> {
        self.state().path.clone()
    }

    pub fn set_show(&self, show: bool) {
        self.state().show = show;
    }

    pub fn is_show(&self) -> bool {
        self.state().show
    }

    /// Last diagnostic; `None` until a scan succeeds or after one fails.
    pub fn diagnostic(&self) -> Option<RouteValidateDiagnostic> {
        self.state().diagnostic.clone()
    }

    /// Samples propagated by the last successful scan.
    pub fn last_samples(&self) -> Vec<RouteSample> {
        self.state().samples.clone()
    }

    /// Rescan the current path and store the outcome.
    ///
    /// Failures are logged and leave no diagnostic behind; they never reach
    /// the caller.
    pub fn cross_detect(&self) -> Option<RouteValidateDiagnostic> {
        let mut state = self.state();
        tracing::info!("Cross detect");

        let outcome = match &state.path {
            Some(path) => self.scan(path),
            None => Err(Error::MissingField("path")),
        };
        match outcome {
            Ok(report) => {
                state.diagnostic = Some(report.diagnostic);
                state.samples = report.samples;
            }
            Err(err) => {
                tracing::error!("Route scan failed: {}", err);
                state.diagnostic = None;
                state.samples.clear();
            }
        }
        state.diagnostic.clone()
    }

    /// Scan `path` without touching the stored state.
    pub fn scan(&self, path: &PathData) -> Result<ScanReport> {
        self.check_settings()?;
        let check_time = Utc::now();
        let samples = self.sample_route(path)?;

        let mut hazards = Vec::new();
        if let Some(draft) = path.ship.draft_m {
            hazards.extend(self.depth_hazards(path, &samples, draft, check_time)?);
        } else {
            tracing::debug!("Ship draft unset, skipping depth check");
        }
        if let Some(danger_height) = path.ship.danger_height_m {
            hazards.extend(self.wave_hazards(&samples, danger_height, check_time));
        } else {
            tracing::debug!("Danger height unset, skipping wave check");
        }

        let diagnostic = RouteValidateDiagnostic::from_hazards(hazards);
        tracing::info!(
            "Scanned {:.0} m route: {} samples, {} hazards",
            path.route.distance(),
            samples.len(),
            diagnostic.hazard_points().len()
        );
        Ok(ScanReport {
            diagnostic,
            samples,
        })
    }

    fn check_settings(&self) -> Result<()> {
        for (name, value) in [
            ("sample_step_m", self.settings.sample_step_m),
            ("fine_step_m", self.settings.fine_step_m),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidInput(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Coarse samples at the fixed step, with interpolated ones in between
    /// and up to the final waypoint.
    fn sample_route(&self, path: &PathData) -> Result<Vec<RouteSample>> {
        let route = &path.route;
        let total = route.distance();
        let step = self.settings.sample_step_m;
        let fine = self.settings.fine_step_m;

        let coarse: Vec<RoutePoint> = (0..)
            .map(|i| i as f64 * step)
            .take_while(|d| *d < total)
            .map(|d| route.point_from_start(d))
            .collect();
        let locations: Vec<Point> = coarse.iter().map(|p| p.point).collect();
        let candidates = self.hazards.select_closest_forecasts(
            &locations,
            self.settings.forecast_radius_deg,
            path.depart_time,
        )?;
        tracing::debug!(
            "Fetched {} forecast candidates for {} samples",
            candidates.len(),
            coarse.len()
        );
        let forecasts = ForecastAccessor::new(candidates);

        let mut walk = Propagation {
            time: path.depart_time,
            speed: path.ship.nominal_speed()?,
            distance_m: 0.0,
            last_forecast: None,
        };
        let mut samples = Vec::new();
        let mut previous_m = 0.0;

        for (idx, point) in coarse.iter().enumerate() {
            for mid in mid_points(route, previous_m, point.distance_from_start_m, fine) {
                samples.push(walk.interpolated(mid)?);
            }

            let forecast = forecasts.closest_forecast(idx, walk.time).cloned();
            if let Some(forecast) = &forecast {
                walk.speed = get_speed(&path.ship, forecast.combined_height())?;
                walk.last_forecast = Some(forecast.clone());
            }
            walk.advance(point.distance_from_start_m)?;
            samples.push(RouteSample {
                route_point: *point,
                expected_time: walk.time,
                speed_mps: walk.speed,
                forecast,
                interpolated: false,
            });
            previous_m = point.distance_from_start_m;
        }

        for mid in mid_points(route, previous_m, total, fine) {
            samples.push(walk.interpolated(mid)?);
        }
        samples.push(walk.interpolated(route.point_from_start(total))?);
        Ok(samples)
    }

    fn wave_hazards(
        &self,
        samples: &[RouteSample],
        danger_height: f64,
        check_time: DateTime<Utc>,
    ) -> Vec<DiagnosticHazardPoint> {
        let hazards: Vec<DiagnosticHazardPoint> = samples
            .iter()
            .filter(|s| !s.interpolated)
            .filter_map(|s| {
                let forecast = s.forecast.as_ref()?;
                let height = forecast.combined_height();
                (height > danger_height).then(|| {
                    make_high_waves_hazard(forecast.location, check_time, s.expected_time, height)
                })
            })
            .collect();
        self.collapse(hazards)
    }

    /// One pair of steering-cone triangles per segment, built at the first
    /// sample on that segment and sent in a single query.
    fn depth_hazards(
        &self,
        path: &PathData,
        samples: &[RouteSample],
        draft: f64,
        check_time: DateTime<Utc>,
    ) -> Result<Vec<DiagnosticHazardPoint>> {
        let nominal = path.ship.nominal_speed()?;
        let segments = path.route.segments();

        let mut triangles = Vec::new();
        let mut entries = Vec::new();
        for (idx, sample) in samples.iter().enumerate() {
            let segment_id = sample.route_point.segment_id;
            if idx > 0 && samples[idx - 1].route_point.segment_id == segment_id {
                continue;
            }
            let alpha = calculate_steering_angle(
                sample.speed_mps,
                nominal,
                self.settings.steering_deg_per_unit,
            );
            triangles.extend(steering_cone_triangles(&segments[segment_id], alpha));
            entries.push(sample);
        }

        let hits = self
            .hazards
            .select_hazard_depth_points_in_angle(&triangles, draft)?;
        if hits.len() != triangles.len() {
            return Err(StorageError::Backend(format!(
                "expected {} triangle results, got {}",
                triangles.len(),
                hits.len()
            ))
            .into());
        }

        let mut hazards = Vec::new();
        for (entry, pair) in entries.iter().zip(hits.chunks(2)) {
            let (left, right) = (&pair[0], &pair[1]);
            // Points on the track line fall in both triangles.
            let right_only = right.iter().filter(|p| !left.contains(p));
            for depth_point in left.iter().chain(right_only) {
                let distance = entry.route_point.point.haversine(&depth_point.location);
                let expected = arrival_after(entry.expected_time, distance, entry.speed_mps)?;
                hazards.push(make_depth_hazard(
                    depth_point.location,
                    check_time,
                    expected,
                    depth_point.depth,
                ));
            }
        }
        tracing::debug!(
            "Depth check over {} segments found {} points",
            entries.len(),
            hazards.len()
        );
        Ok(self.collapse(hazards))
    }

    fn collapse(&self, hazards: Vec<DiagnosticHazardPoint>) -> Vec<DiagnosticHazardPoint> {
        match self.settings.hazard_separation_m {
            Some(separation) => collapse_hazards(hazards, separation),
            None => hazards,
        }
    }
}

/// Running arrival estimate while walking the samples.
struct Propagation {
    time: DateTime<Utc>,
    speed: f64,
    distance_m: f64,
    last_forecast: Option<ForecastPoint>,
}

impl Propagation {
    fn advance(&mut self, to_m: f64) -> Result<()> {
        self.time = arrival_after(self.time, to_m - self.distance_m, self.speed)?;
        self.distance_m = to_m;
        Ok(())
    }

    fn interpolated(&mut self, point: RoutePoint) -> Result<RouteSample> {
        self.advance(point.distance_from_start_m)?;
        Ok(RouteSample {
            route_point: point,
            expected_time: self.time,
            speed_mps: self.speed,
            forecast: self.last_forecast.clone(),
            interpolated: true,
        })
    }
}

/// Route points strictly between `from_m` and `to_m`: every `fine_m` meters
/// plus each waypoint, ordered by distance.
fn mid_points(route: &Route, from_m: f64, to_m: f64, fine_m: f64) -> Vec<RoutePoint> {
    const SAME_DISTANCE_M: f64 = 1e-6;

    let mut points: Vec<RoutePoint> = (0..route.waypoints().len())
        .filter_map(|idx| route.waypoint_point(idx))
        .filter(|p| p.distance_from_start_m > from_m && p.distance_from_start_m < to_m)
        .collect();
    points.extend(
        (1..)
            .map(|k| from_m + k as f64 * fine_m)
            .take_while(|d| *d < to_m - SAME_DISTANCE_M)
            .map(|d| route.point_from_start(d)),
    );
    points.sort_by(|a, b| a.distance_from_start_m.total_cmp(&b.distance_from_start_m));
    points.dedup_by(|later, kept| {
        (later.distance_from_start_m - kept.distance_from_start_m).abs() < SAME_DISTANCE_M
    });
    points
}
