//! Read-only contract for forecast and depth hazard queries.
//!
//! Implementations are expected to answer each call in one batch: callers
//! pass every sample point or envelope triangle at once.

use crate::depth::DepthPoint;
use crate::error::StorageError;
use crate::forecast::ForecastCandidate;
use crate::geom::{Point, Polygon, Segment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Named refuge a vessel can divert to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafePoint {
    pub point: Point,
    pub name: String,
}

pub trait HazardSource: Send + Sync {
    /// Forecasts within `max_radius_deg` of each point whose validity has not
    /// ended before `min_date`. Each candidate records which point it answers.
    fn select_closest_forecasts(
        &self,
        points: &[Point],
        max_radius_deg: f64,
        min_date: DateTime<Utc>,
    ) -> Result<Vec<ForecastCandidate>, StorageError>;

    fn select_forecast_location(&self, forecast_id: i64) -> Result<Point, StorageError>;

    /// Hazardous soundings within `distance_m` of each point, one list per point.
    fn select_hazard_depth_points(
        &self,
        points: &[Point],
        threshold_depth: f64,
        distance_m: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError>;

    /// Hazardous soundings inside each triangle, one list per triangle.
    fn select_hazard_depth_points_in_angle(
        &self,
        triangles: &[Polygon],
        threshold_depth: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError>;

    /// Registered safe points. Sources without a registry have none.
    fn select_safe_points(&self) -> Result<Vec<SafePoint>, StorageError> {
        Ok(Vec::new())
    }
}

impl<T: HazardSource + ?Sized> HazardSource for Arc<T> {
    fn select_closest_forecasts(
        &self,
        points: &[Point],
        max_radius_deg: f64,
        min_date: DateTime<Utc>,
    ) -> Result<Vec<ForecastCandidate>, StorageError> {
        (**self).select_closest_forecasts(points, max_radius_deg, min_date)
    }

    fn select_forecast_location(&self, forecast_id: i64) -> Result<Point, StorageError> {
        (**self).select_forecast_location(forecast_id)
    }

    fn select_hazard_depth_points(
        &self,
        points: &[Point],
        threshold_depth: f64,
        distance_m: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError> {
        (**self).select_hazard_depth_points(points, threshold_depth, distance_m)
    }

    fn select_hazard_depth_points_in_angle(
        &self,
        triangles: &[Polygon],
        threshold_depth: f64,
    ) -> Result<Vec<Vec<DepthPoint>>, StorageError> {
        (**self).select_hazard_depth_points_in_angle(triangles, threshold_depth)
    }

    fn select_safe_points(&self) -> Result<Vec<SafePoint>, StorageError> {
        (**self).select_safe_points()
    }
}

/// A sounding is hazardous when the water above it is no deeper than `draft`.
/// Positive depths are land and always hazardous.
pub fn is_hazard_depth(depth: f64, draft: f64) -> bool {
    -depth <= draft
}

/// The two triangles bounding the steering cone of half-angle `alpha` along
/// `segment`: start, end and the segment direction rotated by ±alpha.
pub fn steering_cone_triangles(segment: &Segment, alpha: f64) -> [Polygon; 2] {
    let direction = segment.direction();
    [alpha, -alpha].map(|angle| {
        Polygon::new(vec![
            segment.start,
            segment.end,
            segment.start + direction.rotate(angle),
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_threshold_has_no_margin() {
        assert!(is_hazard_depth(-5.0, 5.0));
        assert!(is_hazard_depth(-4.9, 5.0));
        assert!(!is_hazard_depth(-5.1, 5.0));
        assert!(is_hazard_depth(2.0, 5.0));
    }

    #[test]
    fn cone_triangles_share_the_segment() {
        let segment = Segment::new(Point::new(0.0, 0.0), Point::new(0.0, 1.0));
        let [left, right] = steering_cone_triangles(&segment, 0.1);
        for triangle in [&left, &right] {
            assert_eq!(triangle.points.len(), 3);
            assert_eq!(triangle.points[0], segment.start);
            assert_eq!(triangle.points[1], segment.end);
        }
        assert!(left.points[2].lat * right.points[2].lat < 0.0);
    }

    #[test]
    fn point_beside_the_track_falls_in_one_cone() {
        let segment = Segment::new(Point::new(0.0, 0.0), Point::new(0.0, 1.0));
        let triangles = steering_cone_triangles(&segment, 5.0_f64.to_radians());
        let near_track = Point::new(0.03, 0.8);
        let far_off = Point::new(0.5, 0.5);
        assert!(triangles.iter().any(|t| t.contains(&near_track)));
        assert!(!triangles.iter().any(|t| t.contains(&far_off)));
    }
}
