//! Server configuration from environment.

use marine_core::{RouterSettings, ScanSettings};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// JSON hazard snapshot loaded at startup and on every reload.
    pub hazard_snapshot: Option<PathBuf>,
    pub scan: ScanSettings,
    pub router: RouterSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            hazard_snapshot: None,
            scan: ScanSettings::default(),
            router: RouterSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut router = defaults.router;
        router.grid_step_deg = parse_var("MARINE_GRID_STEP_DEG").unwrap_or(router.grid_step_deg);
        router.limits.max_vertices =
            parse_var("MARINE_MAX_LATTICE_VERTICES").unwrap_or(router.limits.max_vertices);

        let mut scan = defaults.scan;
        scan.sample_step_m = parse_var("MARINE_SAMPLE_STEP_M").unwrap_or(scan.sample_step_m);

        Self {
            server_port: parse_var("MARINE_PORT").unwrap_or(defaults.server_port),
            hazard_snapshot: env::var("MARINE_HAZARD_SNAPSHOT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            scan,
            router,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
