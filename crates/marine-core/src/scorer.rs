//! Edge cost models for the grid router.

use crate::error::{Error, Result, StorageError};
use crate::forecast::ForecastAccessor;
use crate::geom::{Point, Segment};
use crate::hazards::{steering_cone_triangles, HazardSource};
use crate::settings::RouterSettings;
use crate::ship::{
    arrival_after, calculate_steering_angle, get_speed, travel_duration, ShipPerformanceInfo,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    #[default]
    Time,
    Fuel,
}

impl fmt::Display for ScoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreType::Time => write!(f, "time"),
            ScoreType::Fuel => write!(f, "fuel"),
        }
    }
}

/// Cost of moving between adjacent lattice points when leaving at `depart`.
///
/// `score` and `arrival_time` must derive from the same speed estimate.
/// `score` returns `None` for an edge that must never be taken.
pub trait Scorer {
    /// Hint that every edge from `from` to `to` is about to be scored, so
    /// implementations can batch their hazard queries.
    fn prefetch(&mut self, _from: usize, _to: &[usize], _depart: DateTime<Utc>) -> Result<()> {
        Ok(())
    }

    fn score(&mut self, from: usize, to: usize, depart: DateTime<Utc>) -> Result<Option<i64>>;

    fn arrival_time(&mut self, from: usize, to: usize, depart: DateTime<Utc>)
        -> Result<DateTime<Utc>>;
}

/// Travel time in milliseconds under the forecast nearest each edge's start.
/// Edges whose steering cone holds a shallow point are blocked.
pub struct TimeScorer {
    ship: ShipPerformanceInfo,
    points: Vec<Point>,
    hazards: Arc<dyn HazardSource>,
    forecasts: ForecastAccessor,
    nominal_speed: f64,
    steering_deg_per_unit: f64,
    blocked: HashMap<(usize, usize), bool>,
}

impl TimeScorer {
    /// Fetch forecasts for every lattice point in one query.
    pub fn new(
        ship: ShipPerformanceInfo,
        points: Vec<Point>,
        hazards: Arc<dyn HazardSource>,
        min_time: DateTime<Utc>,
        settings: &RouterSettings,
    ) -> Result<Self> {
        let nominal_speed = ship.nominal_speed()?;
        let candidates =
            hazards.select_closest_forecasts(&points, settings.forecast_radius_deg, min_time)?;
        tracing::debug!(
            "Time scorer loaded {} forecast candidates for {} lattice points",
            candidates.len(),
            points.len()
        );
        Ok(Self {
            ship,
            points,
            hazards,
            forecasts: ForecastAccessor::new(candidates),
            nominal_speed,
            steering_deg_per_unit: settings.steering_deg_per_unit,
            blocked: HashMap::new(),
        })
    }

    fn point(&self, id: usize) -> Result<Point> {
        self.points
            .get(id)
            .copied()
            .ok_or_else(|| Error::InvalidInput(format!("unknown lattice point {id}")))
    }

    fn speed(&self, from: usize, depart: DateTime<Utc>) -> Result<f64> {
        let wave_height = self
            .forecasts
            .closest_forecast(from, depart)
            .map_or(0.0, |f| f.combined_height());
        get_speed(&self.ship, wave_height)
    }
}

impl Scorer for TimeScorer {
    fn prefetch(&mut self, from: usize, to: &[usize], depart: DateTime<Utc>) -> Result<()> {
        let pending: Vec<usize> = to
            .iter()
            .copied()
            .filter(|t| !self.blocked.contains_key(&(from, *t)))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        let Some(draft) = self.ship.draft_m else {
            for t in pending {
                self.blocked.insert((from, t), false);
            }
            return Ok(());
        };

        let start = self.point(from)?;
        let alpha = calculate_steering_angle(
            self.speed(from, depart)?,
            self.nominal_speed,
            self.steering_deg_per_unit,
        );
        let mut triangles = Vec::with_capacity(pending.len() * 2);
        for &t in &pending {
            let segment = Segment::new(start, self.point(t)?);
            triangles.extend(steering_cone_triangles(&segment, alpha));
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
        for (t, pair) in pending.iter().zip(hits.chunks(2)) {
            let blocked = pair.iter().any(|points| !points.is_empty());
            self.blocked.insert((from, *t), blocked);
        }
        Ok(())
    }

    fn score(&mut self, from: usize, to: usize, depart: DateTime<Utc>) -> Result<Option<i64>> {
        if !self.blocked.contains_key(&(from, to)) {
            self.prefetch(from, &[to], depart)?;
        }
        if self.blocked.get(&(from, to)).copied().unwrap_or(false) {
            return Ok(None);
        }
        let distance = self.point(from)?.haversine(&self.point(to)?);
        let duration = travel_duration(distance, self.speed(from, depart)?)?;
        Ok(Some(duration.num_milliseconds().max(0)))
    }

    fn arrival_time(
        &mut self,
        from: usize,
        to: usize,
        depart: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let distance = self.point(from)?.haversine(&self.point(to)?);
        arrival_after(depart, distance, self.speed(from, depart)?)
    }
}
