//! Wave forecasts and nearest-in-time lookup per sample point.

use crate::geom::Point;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Forecasts whose validity ends further than this past the expected time
/// are never trusted.
pub const MAX_FORECAST_LEAD: Duration = Duration::hours(6);

/// A single weather sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub forecast_id: i64,
    pub location: Point,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub wave_height_m: Option<f64>,
    #[serde(default)]
    pub swell_height_m: Option<f64>,
}

impl ForecastPoint {
    /// Wave plus swell height; a missing component counts as zero.
    pub fn combined_height(&self) -> f64 {
        self.wave_height_m.unwrap_or(0.0) + self.swell_height_m.unwrap_or(0.0)
    }
}

/// A forecast returned for one queried point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCandidate {
    pub forecast: ForecastPoint,
    /// Distance between the forecast location and the queried point.
    pub distance: f64,
    /// Index of the queried point this candidate answers.
    pub point_index: usize,
}

/// Candidates grouped by the point they were queried for.
#[derive(Debug, Clone, Default)]
pub struct ForecastAccessor {
    by_point: HashMap<usize, Vec<ForecastPoint>>,
}

impl ForecastAccessor {
    pub fn new(candidates: Vec<ForecastCandidate>) -> Self {
        let mut by_point: HashMap<usize, Vec<ForecastPoint>> = HashMap::new();
        for candidate in candidates {
            by_point
                .entry(candidate.point_index)
                .or_default()
                .push(candidate.forecast);
        }
        Self { by_point }
    }

    pub fn point_count(&self) -> usize {
        self.by_point.len()
    }

    /// Forecast valid at or before `expected_time` whose validity end is
    /// closest to it, unless that end lies more than [`MAX_FORECAST_LEAD`] ahead.
    pub fn closest_forecast(
        &self,
        point_id: usize,
        expected_time: DateTime<Utc>,
    ) -> Option<&ForecastPoint> {
        let nearest = self
            .by_point
            .get(&point_id)?
            .iter()
            .filter(|forecast| forecast.valid_from <= expected_time)
            .min_by_key(|forecast| (forecast.valid_until - expected_time).abs())?;

        if nearest.valid_until - expected_time > MAX_FORECAST_LEAD {
            tracing::debug!(
                point_id,
                forecast_id = nearest.forecast_id,
                "closest forecast ends too far ahead, ignoring"
            );
            return None;
        }
        Some(nearest)
    }
}
