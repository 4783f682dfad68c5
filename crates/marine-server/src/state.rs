//! Shared server state.

use chrono::{DateTime, Utc};
use marine_core::{
    BestRouteMaker, DepthPoint, ForecastCandidate, HazardSource, MemoryHazardStore, Point,
    Polygon, RouteScanner, SafePoint, StorageError,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::Config;

/// Hazard source whose backing data can be replaced while the server runs.
///
/// Each query reads the current source once, so a swap never splits a
/// single query across two snapshots.
pub struct SwappableSource {
    current: RwLock<Arc<dyn HazardSource>>,
}

impl SwappableSource {
    pub fn new(initial: Arc<dyn HazardSource>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub fn current(&self) -> Arc<dyn HazardSource> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn replace(&self, source: Arc<dyn HazardSource>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = source;
    }
}

impl HazardSource for SwappableSource {
    fn select_closest_forecasts(
        &self,
        points: &[Point],
        max_radius_deg: f64,
        min_date: DateTime<Utc>,
    ) -> Result<Vec<ForecastCandidate>, StorageError> {
        self.current()
            .select_closest_forecasts(points, max_radius_deg, min_date)
    }

    fn select_forecast_location(&self, forecast_id: i64) -> Result<Point, StorageError> {
        self.current().select_forecast_location(forecast_id)
    }

    fn select_hazard_depth_points(
        &self,
        points: &[Point],
        threshold_depth: f64,
        distance_m: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError> {
        self.current()
            .select_hazard_depth_points(points, threshold_depth, distance_m)
    }

    fn select_hazard_depth_points_in_angle(
        &self,
        triangles: &[Polygon],
        threshold_depth: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError> {
        self.current()
            .select_hazard_depth_points_in_angle(triangles, threshold_depth)
    }

    fn select_safe_points(&self) -> Result<Vec<SafePoint>, StorageError> {
        self.current().select_safe_points()
    }
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub hazards: Arc<SwappableSource>,
    pub scanner: RouteScanner,
    pub route_maker: BestRouteMaker,
    /// Set while a snapshot reload is running.
    pub reload_in_flight: AtomicBool,
}

impl AppState {
    /// Start with an empty hazard store.
    pub fn new(config: Config) -> Self {
        Self::with_hazards(config, Arc::new(MemoryHazardStore::default()))
    }

    pub fn with_hazards(config: Config, initial: Arc<dyn HazardSource>) -> Self {
        let hazards = Arc::new(SwappableSource::new(initial));
        let scanner = RouteScanner::new(hazards.clone(), config.scan.clone());
        let route_maker = BestRouteMaker::new(hazards.clone(), config.router.clone());
        Self {
            config,
            hazards,
            scanner,
            route_maker,
            reload_in_flight: AtomicBool::new(false),
        }
    }
}
