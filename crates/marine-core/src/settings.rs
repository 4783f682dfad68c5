//! Tunables for the route scanner and the grid router.

use serde::{Deserialize, Serialize};

/// Configuration for route scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Spacing of forecast-queried samples along the route, meters
    pub sample_step_m: f64,
    /// Spacing of interpolated samples between coarse ones, meters
    pub fine_step_m: f64,
    /// Search radius for forecasts around each sample, degrees
    pub forecast_radius_deg: f64,
    /// Minimum distance between reported hazards of the same kind; `None` keeps all
    pub hazard_separation_m: Option<f64>,
    /// Steering-cone half-angle in degrees at nominal speed
    pub steering_deg_per_unit: f64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            sample_step_m: 10_000.0,
            fine_step_m: 1_000.0,
            forecast_radius_deg: 0.1,
            hazard_separation_m: Some(10_000.0),
            steering_deg_per_unit: 1.0,
        }
    }
}

/// Caps on lattice size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLimits {
    /// Maximum lattice cells along either axis of the bounding box
    pub max_axis_cells: u64,
    /// Maximum bounding-box candidates and retained vertices
    pub max_vertices: u64,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_axis_cells: 1_000_000,
            max_vertices: 10_000,
        }
    }
}

/// Configuration for best-route search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Lattice spacing, degrees
    pub grid_step_deg: f64,
    /// Search radius for forecasts around each lattice point, degrees
    pub forecast_radius_deg: f64,
    /// Steering-cone half-angle in degrees at nominal speed
    pub steering_deg_per_unit: f64,
    pub limits: GridLimits,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            grid_step_deg: 0.1,
            forecast_radius_deg: 0.1,
            steering_deg_per_unit: 1.0,
            limits: GridLimits::default(),
        }
    }
}
