//! Marine CLI - command line tools for the marine route core.
//!
//! Binaries:
//! - scan_route: scan one voyage for wave and depth hazards
//! - best_route: search the least-time route inside a bounding polygon

use anyhow::Context;
use marine_core::{HazardSnapshot, HazardSource, MemoryHazardStore};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Compact stderr logging, `RUST_LOG` overrides the `warn` default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Hazard source from a snapshot file, or an empty store when none is given.
pub fn load_hazards(path: Option<&Path>) -> anyhow::Result<Arc<dyn HazardSource>> {
    match path {
        Some(path) => {
            let snapshot = HazardSnapshot::from_json_file(path)
                .with_context(|| format!("failed to load hazards from {}", path.display()))?;
            Ok(snapshot.into_source())
        }
        None => {
            tracing::warn!("No hazard snapshot given; scanning against empty data");
            Ok(Arc::new(MemoryHazardStore::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use marine_core::{PathData, Point};

    fn temp_file(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("marine-cli-{}-{name}", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_path_data() {
        let path = temp_file(
            "path.json",
            r#"{
                "route": {"waypoints": [{"lat": 1.0, "lon": 2.0}, {"lat": 1.5, "lon": 2.5}]},
                "ship": {"speed_mps": 6.0},
                "depart_time": "2024-06-01T06:00:00Z"
            }"#,
        );
        let data: PathData = load_json(&path).unwrap();
        assert_eq!(data.route.waypoints()[0], Point::new(1.0, 2.0));
        assert_eq!(data.ship.speed_mps, Some(6.0));
        assert_eq!(
            data.depart_time,
            Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap()
        );
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn hazard_snapshot_answers_depth_queries() {
        let path = temp_file(
            "hazards.json",
            r#"{"depths": [{"location": "POINT(2 1)", "depth": -3.0}]}"#,
        );
        let hazards = load_hazards(Some(&path)).unwrap();
        let hits = hazards
            .select_hazard_depth_points(&[Point::new(1.0, 2.0)], 5.0, 100.0)
            .unwrap();
        assert_eq!(hits[0].len(), 1);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_json::<PathData>(Path::new("/nonexistent/marine.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/marine.json"));
    }
}
