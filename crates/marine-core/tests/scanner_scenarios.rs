//! End-to-end route scans against an in-memory hazard store.

use chrono::{DateTime, Duration, TimeZone, Utc};
use marine_core::{
    DepthPoint, DiagnosticStatus, Error, ForecastCandidate, ForecastPoint, HazardKind,
    HazardSource, MemoryHazardStore, PathData, Point, Polygon, Route, RouteScanner,
    ScanSettings, ShipPerformanceInfo, StorageError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn depart() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap()
}

/// About 33 km due east along the equator.
fn equator_route() -> Route {
    Route::new(vec![Point::new(0.0, 0.0), Point::new(0.0, 0.3)]).unwrap()
}

fn guarded_ship() -> ShipPerformanceInfo {
    ShipPerformanceInfo {
        danger_height_m: Some(4.0),
        draft_m: Some(6.0),
        ..ShipPerformanceInfo::with_speed(5.0)
    }
}

fn path(ship: ShipPerformanceInfo) -> PathData {
    PathData {
        route: equator_route(),
        ship,
        depart_time: depart(),
    }
}

fn forecast(location: Point, wave: f64, swell: f64, until_hours: i64) -> ForecastPoint {
    ForecastPoint {
        forecast_id: 7,
        location,
        valid_from: depart() - Duration::hours(1),
        valid_until: depart() + Duration::hours(until_hours),
        wave_height_m: Some(wave),
        swell_height_m: Some(swell),
    }
}

fn scan(store: MemoryHazardStore, data: PathData) -> Option<marine_core::RouteValidateDiagnostic> {
    let scanner = RouteScanner::new(Arc::new(store), ScanSettings::default());
    scanner.set_path_data(data);
    scanner.cross_detect()
}

#[test]
fn clear_water_is_ok() {
    let store = MemoryHazardStore::default()
        .with_forecast(forecast(Point::new(0.0, 0.0), 1.0, 0.5, 2))
        .with_depth(Point::new(0.0, 0.15), -80.0);
    let diagnostic = scan(store, path(guarded_ship())).unwrap();
    assert_eq!(diagnostic.status(), DiagnosticStatus::Ok);
    assert!(diagnostic.hazard_points().is_empty());
}

#[test]
fn high_waves_raise_a_warning() {
    let store =
        MemoryHazardStore::default().with_forecast(forecast(Point::new(0.0, 0.0), 4.5, 1.5, 2));
    let diagnostic = scan(store, path(guarded_ship())).unwrap();

    assert_eq!(diagnostic.status(), DiagnosticStatus::Warning);
    let waves: Vec<_> = diagnostic
        .hazard_points()
        .iter()
        .filter(|p| p.kind() == HazardKind::HighWaves)
        .collect();
    // Every sample near the single forecast site collapses into one report.
    assert_eq!(waves.len(), 1);
    assert!(waves[0].reason().contains("dangerous wave height 6"));
    assert_eq!(waves[0].location(), Point::new(0.0, 0.0));
    assert_eq!(waves[0].expected_time(), depart());
}

#[test]
fn waves_ignored_without_danger_height() {
    let store =
        MemoryHazardStore::default().with_forecast(forecast(Point::new(0.0, 0.0), 4.5, 1.5, 2));
    let ship = ShipPerformanceInfo {
        danger_height_m: None,
        ..guarded_ship()
    };
    assert!(scan(store, path(ship)).unwrap().is_ok());
}

#[test]
fn stale_forecast_is_not_trusted() {
    let store =
        MemoryHazardStore::default().with_forecast(forecast(Point::new(0.0, 0.0), 4.5, 1.5, 7));
    assert!(scan(store, path(guarded_ship())).unwrap().is_ok());
}

#[test]
fn shallow_water_on_track_is_reported_with_eta() {
    let shoal = Point::new(0.0, 0.15);
    let store = MemoryHazardStore::default()
        .with_depth(shoal, -3.0)
        .with_depth(Point::new(0.0, 0.2), -40.0)
        .with_depth(Point::new(1.0, 0.15), -1.0);
    let diagnostic = scan(store, path(guarded_ship())).unwrap();

    assert_eq!(diagnostic.status(), DiagnosticStatus::Warning);
    let points = diagnostic.hazard_points();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].kind(), HazardKind::Depth);
    assert_eq!(points[0].reason(), "dangerous depth -3");

    let seconds = Point::new(0.0, 0.0).haversine(&shoal) / 5.0;
    let eta = points[0].expected_time() - depart();
    assert!((eta.num_milliseconds() as f64 / 1000.0 - seconds).abs() < 1.0);
}

#[test]
fn depth_check_uses_each_segment() {
    let route = Route::new(vec![
        Point::new(0.0, 0.0),
        Point::new(0.0, 0.1),
        Point::new(0.1, 0.1),
    ])
    .unwrap();
    let store = MemoryHazardStore::default().with_depth(Point::new(0.05, 0.1), -2.0);
    let data = PathData {
        route,
        ship: guarded_ship(),
        depart_time: depart(),
    };
    let diagnostic = scan(store, data).unwrap();
    assert_eq!(diagnostic.hazard_points().len(), 1);

    // Leg two starts after the first leg at nominal speed.
    let first_leg_s = Point::new(0.0, 0.0).haversine(&Point::new(0.0, 0.1)) / 5.0;
    let second_leg_s = Point::new(0.0, 0.1).haversine(&Point::new(0.05, 0.1)) / 5.0;
    let eta = diagnostic.hazard_points()[0].expected_time() - depart();
    assert!((eta.num_milliseconds() as f64 / 1000.0 - first_leg_s - second_leg_s).abs() < 1.0);
}

#[test]
fn shallow_water_ignored_without_draft() {
    let store = MemoryHazardStore::default().with_depth(Point::new(0.0, 0.15), -3.0);
    let ship = ShipPerformanceInfo {
        draft_m: None,
        ..guarded_ship()
    };
    assert!(scan(store, path(ship)).unwrap().is_ok());
}

#[test]
fn waves_slow_the_voyage() {
    let rough_ship = ShipPerformanceInfo {
        engine_power_kw: Some(5000.0),
        displacement_t: Some(10_000.0),
        length_m: Some(120.0),
        fullness: Some(0.7),
        danger_height_m: Some(10.0),
        ..guarded_ship()
    };
    let calm = RouteScanner::new(
        Arc::new(MemoryHazardStore::default()),
        ScanSettings::default(),
    )
    .scan(&path(rough_ship.clone()))
    .unwrap();
    let rough = RouteScanner::new(
        Arc::new(
            MemoryHazardStore::default()
                .with_forecast(forecast(Point::new(0.0, 0.1), 4.0, 2.0, 3)),
        ),
        ScanSettings::default(),
    )
    .scan(&path(rough_ship))
    .unwrap();

    let calm_eta = calm.samples.last().unwrap().expected_time;
    let rough_eta = rough.samples.last().unwrap().expected_time;
    assert!(rough_eta > calm_eta);
    assert!(rough.diagnostic.is_ok());
}

#[test]
fn repeated_scans_agree_except_for_check_time() {
    let store = MemoryHazardStore::default()
        .with_forecast(forecast(Point::new(0.0, 0.2), 5.0, 1.0, 2))
        .with_depth(Point::new(0.0, 0.05), -1.0);
    let scanner = RouteScanner::new(Arc::new(store), ScanSettings::default());
    let data = path(guarded_ship());

    let first = scanner.scan(&data).unwrap();
    let second = scanner.scan(&data).unwrap();
    assert_eq!(first.samples, second.samples);

    let key = |report: &marine_core::ScanReport| {
        report
            .diagnostic
            .hazard_points()
            .iter()
            .map(|p| (p.location(), p.expected_time(), p.reason().to_string()))
            .collect::<Vec<_>>()
    };
    assert_eq!(key(&first), key(&second));
    assert_eq!(first.diagnostic.hazard_points().len(), 2);
}

#[test]
fn missing_speed_leaves_no_diagnostic() {
    let ship = ShipPerformanceInfo {
        speed_mps: None,
        ..guarded_ship()
    };
    let scanner = RouteScanner::new(
        Arc::new(MemoryHazardStore::default()),
        ScanSettings::default(),
    );
    assert!(matches!(
        scanner.scan(&path(ship.clone())),
        Err(Error::MissingField("speed"))
    ));
    scanner.set_path_data(path(ship));
    assert!(scanner.cross_detect().is_none());
    assert!(scanner.diagnostic().is_none());
}

/// Hazard source that can be switched into a failing state.
struct FlakySource {
    failing: AtomicBool,
    inner: MemoryHazardStore,
}

impl FlakySource {
    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("connection lost".into()));
        }
        Ok(())
    }
}

impl HazardSource for FlakySource {
    fn select_closest_forecasts(
        &self,
        points: &[Point],
        max_radius_deg: f64,
        min_date: DateTime<Utc>,
    ) -> Result<Vec<ForecastCandidate>, StorageError> {
        self.check()?;
        self.inner
            .select_closest_forecasts(points, max_radius_deg, min_date)
    }

    fn select_forecast_location(&self, forecast_id: i64) -> Result<Point, StorageError> {
        self.check()?;
        self.inner.select_forecast_location(forecast_id)
    }

    fn select_hazard_depth_points(
        &self,
        points: &[Point],
        threshold_depth: f64,
        distance_m: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError> {
        self.check()?;
        self.inner
            .select_hazard_depth_points(points, threshold_depth, distance_m)
    }

    fn select_hazard_depth_points_in_angle(
        &self,
        triangles: &[Polygon],
        threshold_depth: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError> {
        self.check()?;
        self.inner
            .select_hazard_depth_points_in_angle(triangles, threshold_depth)
    }
}

#[test]
fn storage_failure_resets_previous_diagnostic() {
    let source = Arc::new(FlakySource {
        failing: AtomicBool::new(false),
        inner: MemoryHazardStore::default(),
    });
    let scanner = RouteScanner::new(source.clone(), ScanSettings::default());
    scanner.set_path_data(path(guarded_ship()));

    assert!(scanner.cross_detect().is_some());
    assert!(!scanner.last_samples().is_empty());

    source.failing.store(true, Ordering::SeqCst);
    assert!(scanner.cross_detect().is_none());
    assert!(scanner.diagnostic().is_none());
    assert!(scanner.last_samples().is_empty());
    assert!(scanner.path_data().is_some());
}

#[test]
fn unrepresentable_arrival_resets_previous_diagnostic() {
    let scanner = RouteScanner::new(
        Arc::new(MemoryHazardStore::default()),
        ScanSettings::default(),
    );
    scanner.set_path_data(path(guarded_ship()));
    assert!(scanner.cross_detect().is_some());

    // A nanometre per second puts the arrival a million years out.
    let crawling = ShipPerformanceInfo {
        speed_mps: Some(1e-9),
        ..guarded_ship()
    };
    assert!(matches!(
        scanner.scan(&path(crawling.clone())),
        Err(Error::InvalidInput(_))
    ));
    scanner.set_path_data(path(crawling));
    assert!(scanner.cross_detect().is_none());
    assert!(scanner.diagnostic().is_none());
    assert!(scanner.last_samples().is_empty());
}

#[test]
fn departure_at_calendar_end_is_an_input_error() {
    let scanner = RouteScanner::new(
        Arc::new(MemoryHazardStore::default()),
        ScanSettings::default(),
    );
    let data = PathData {
        depart_time: DateTime::<Utc>::MAX_UTC,
        ..path(guarded_ship())
    };
    assert!(matches!(scanner.scan(&data), Err(Error::InvalidInput(_))));
}

#[test]
fn sample_step_longer_than_route_still_scans() {
    let settings = ScanSettings {
        sample_step_m: 1e20,
        ..ScanSettings::default()
    };
    let scanner = RouteScanner::new(
        Arc::new(MemoryHazardStore::default().with_depth(Point::new(0.0, 0.15), -3.0)),
        settings,
    );
    let report = scanner.scan(&path(guarded_ship())).unwrap();

    // One coarse sample at the start, the rest filled in at the fine step.
    assert_eq!(report.samples.iter().filter(|s| !s.interpolated).count(), 1);
    assert!(report.samples.len() > 30);
    assert_eq!(report.diagnostic.hazard_points().len(), 1);
}
