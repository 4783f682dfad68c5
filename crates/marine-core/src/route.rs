//! Waypoint polyline with arclength parametrization.

use crate::error::{Error, Result};
use crate::geom::{Point, Segment};
use serde::{Deserialize, Serialize};

/// A position along a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub point: Point,
    pub segment_id: usize,
    pub distance_from_start_m: f64,
    pub distance_in_segment_m: f64,
}

/// Wire form of a route: just its waypoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteWaypoints {
    pub waypoints: Vec<Point>,
}

/// Ordered waypoint path with precomputed segment lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RouteWaypoints", into = "RouteWaypoints")]
pub struct Route {
    waypoints: Vec<Point>,
    segments: Vec<Segment>,
    /// Cumulative distance at the start of each waypoint.
    cumulative_m: Vec<f64>,
}

impl Route {
    /// Build a route from at least two waypoints with no zero-length legs.
    pub fn new(waypoints: Vec<Point>) -> Result<Self> {
        if waypoints.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "route needs at least 2 waypoints, got {}",
                waypoints.len()
            )));
        }
        let segments: Vec<Segment> = waypoints
            .windows(2)
            .map(|pair| Segment::new(pair[0], pair[1]))
            .collect();

        let mut cumulative_m = Vec::with_capacity(waypoints.len());
        let mut total = 0.0;
        cumulative_m.push(total);
        for (idx, segment) in segments.iter().enumerate() {
            let length = segment.length();
            if length.is_nan() || length <= 0.0 {
                return Err(Error::InvalidInput(format!(
                    "route segment {idx} has zero length"
                )));
            }
            total += length;
            cumulative_m.push(total);
        }

        Ok(Self {
            waypoints,
            segments,
            cumulative_m,
        })
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Arclength at the start of waypoint `idx`.
    pub fn distance_to_waypoint(&self, idx: usize) -> Option<f64> {
        self.cumulative_m.get(idx).copied()
    }

    /// Route point sitting exactly on waypoint `idx`, attributed to the
    /// segment that starts there (the last segment for the final waypoint).
    pub fn waypoint_point(&self, idx: usize) -> Option<RoutePoint> {
        let point = *self.waypoints.get(idx)?;
        let segment_id = idx.min(self.segments.len() - 1);
        let distance_from_start_m = self.cumulative_m[idx];
        Some(RoutePoint {
            point,
            segment_id,
            distance_from_start_m,
            distance_in_segment_m: distance_from_start_m - self.cumulative_m[segment_id],
        })
    }

    /// Total length in meters.
    pub fn distance(&self) -> f64 {
        self.cumulative_m.last().copied().unwrap_or(0.0)
    }

    /// Point at arclength `distance_m`, linearly interpolated within its segment.
    ///
    /// Distances past the end clamp to the final waypoint.
    pub fn point_from_start(&self, distance_m: f64) -> RoutePoint {
        let distance_m = distance_m.max(0.0);
        for (idx, segment) in self.segments.iter().enumerate() {
            let start = self.cumulative_m[idx];
            let end = self.cumulative_m[idx + 1];
            if distance_m <= end {
                let within = distance_m - start;
                let k = within / (end - start);
                return RoutePoint {
                    point: segment.start + segment.direction() * k,
                    segment_id: idx,
                    distance_from_start_m: distance_m,
                    distance_in_segment_m: within,
                };
            }
        }

        let last = self.segments.len() - 1;
        let total = self.distance();
        RoutePoint {
            point: self.waypoints[self.waypoints.len() - 1],
            segment_id: last,
            distance_from_start_m: total,
            distance_in_segment_m: total - self.cumulative_m[last],
        }
    }
}

impl TryFrom<RouteWaypoints> for Route {
    type Error = Error;

    fn try_from(value: RouteWaypoints) -> Result<Self> {
        Route::new(value.waypoints)
    }
}

impl From<Route> for RouteWaypoints {
    fn from(route: Route) -> Self {
        RouteWaypoints {
            waypoints: route.waypoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag() -> Route {
        Route::new(vec![
            Point::new(44.0, 37.0),
            Point::new(44.2, 37.3),
            Point::new(44.1, 37.6),
            Point::new(44.4, 37.7),
        ])
        .unwrap()
    }

    #[test]
    fn distance_is_sum_of_haversine_legs() {
        let route = zigzag();
        let expected: f64 = route
            .waypoints()
            .windows(2)
            .map(|pair| pair[0].haversine(&pair[1]))
            .sum();
        assert!((route.distance() - expected).abs() < 1e-6);
    }

    #[test]
    fn end_of_route_is_last_waypoint() {
        let route = zigzag();
        let end = route.point_from_start(route.distance());
        let last = route.waypoints()[3];
        assert!((end.point.lat - last.lat).abs() < 1e-9);
        assert!((end.point.lon - last.lon).abs() < 1e-9);
        assert_eq!(end.segment_id, 2);

        let beyond = route.point_from_start(route.distance() + 5_000.0);
        assert_eq!(beyond.point, last);
        assert_eq!(beyond.segment_id, 2);
    }

    #[test]
    fn point_from_start_is_monotonic() {
        let route = zigzag();
        let mut previous = -1.0;
        let mut previous_segment = 0;
        let steps = 200;
        for i in 0..=steps {
            let d = route.distance() * i as f64 / steps as f64;
            let rp = route.point_from_start(d);
            assert!(rp.distance_from_start_m > previous);
            assert!(rp.segment_id >= previous_segment);
            previous = rp.distance_from_start_m;
            previous_segment = rp.segment_id;
        }
    }

    #[test]
    fn start_is_first_waypoint() {
        let route = zigzag();
        let start = route.point_from_start(0.0);
        assert_eq!(start.point, route.waypoints()[0]);
        assert_eq!(start.segment_id, 0);
        assert_eq!(start.distance_in_segment_m, 0.0);
    }

    #[test]
    fn waypoint_point_starts_its_segment() {
        let route = zigzag();
        let second = route.waypoint_point(1).unwrap();
        assert_eq!(second.segment_id, 1);
        assert_eq!(second.distance_in_segment_m, 0.0);
        assert_eq!(Some(second.distance_from_start_m), route.distance_to_waypoint(1));

        let last = route.waypoint_point(3).unwrap();
        assert_eq!(last.segment_id, 2);
        assert!((last.distance_from_start_m - route.distance()).abs() < 1e-9);
        assert!(route.waypoint_point(4).is_none());
    }

    #[test]
    fn rejects_short_and_degenerate_routes() {
        assert!(Route::new(vec![Point::new(1.0, 1.0)]).is_err());
        assert!(Route::new(vec![Point::new(1.0, 1.0), Point::new(1.0, 1.0)]).is_err());
    }

    #[test]
    fn deserializes_from_waypoints() {
        let route: Route = serde_json::from_str(
            r#"{"waypoints":[{"lat":44.0,"lon":37.0},{"lat":44.5,"lon":37.5}]}"#,
        )
        .unwrap();
        assert_eq!(route.segments().len(), 1);
        assert!(serde_json::from_str::<Route>(r#"{"waypoints":[]}"#).is_err());
    }
}
