//! Geometry kernel: points as 2D vectors, segments, polygons and
//! great-circle distances.
//!
//! Points carry geographic coordinates in decimal degrees. Vector operations
//! treat longitude as X and latitude as Y, so rotations and cross products
//! work in the plate carrée plane; distances use the haversine formula.

use crate::error::GeometryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

/// Tolerance for treating a cross product as zero.
pub const EPS: f64 = 1e-5;

/// Mean earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn x(&self) -> f64 {
        self.lon
    }

    pub fn y(&self) -> f64 {
        self.lat
    }

    /// Rotate the vector clockwise by `alpha` radians in the (lon, lat) plane.
    pub fn rotate(&self, alpha: f64) -> Point {
        let (sin, cos) = alpha.sin_cos();
        Point {
            lat: self.lat * cos - self.lon * sin,
            lon: self.lat * sin + self.lon * cos,
        }
    }

    pub fn norm(&self) -> f64 {
        (self.lat * self.lat + self.lon * self.lon).sqrt()
    }

    /// Great-circle distance to `other` in meters.
    pub fn haversine(&self, other: &Point) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }

    fn unit(&self) -> Point {
        let norm = self.norm();
        if norm <= f64::EPSILON {
            return Point::default();
        }
        *self * (1.0 / norm)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.lat + rhs.lat, self.lon + rhs.lon)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.lat - rhs.lat, self.lon - rhs.lon)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, k: f64) -> Point {
        Point::new(self.lat * k, self.lon * k)
    }
}

impl Mul<Point> for f64 {
    type Output = Point;

    fn mul(self, p: Point) -> Point {
        p * self
    }
}

pub fn dot_product(a: Point, b: Point) -> f64 {
    a.x() * b.x() + a.y() * b.y()
}

pub fn cross_product(a: Point, b: Point) -> f64 {
    a.x() * b.y() - a.y() * b.x()
}

fn sign(value: f64) -> i8 {
    if value.abs() < EPS {
        0
    } else if value < 0.0 {
        -1
    } else {
        1
    }
}

/// Whether vector `b` lies inside the angle spanned by `a` and `c`.
///
/// Near-zero cross products count as on the boundary, hence inside.
pub fn is_inside_of_angle(a: Point, b: Point, c: Point) -> bool {
    let cross_ab = sign(cross_product(a, b));
    let cross_bc = sign(cross_product(b, c));
    cross_ab == cross_bc || cross_ab == 0 || cross_bc == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn direction(&self) -> Point {
        self.end - self.start
    }

    /// Haversine length in meters.
    pub fn length(&self) -> f64 {
        self.start.haversine(&self.end)
    }
}

/// Closed region given by its vertices in order. The closing edge is implicit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Fails when fewer than three vertices are present.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.points.len() < 3 {
            return Err(GeometryError::DegeneratePolygon {
                points: self.points.len(),
            });
        }
        Ok(())
    }

    /// (min, max) corners of the bounding box.
    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;
        for point in &self.points[1..] {
            min.lat = min.lat.min(point.lat);
            min.lon = min.lon.min(point.lon);
            max.lat = max.lat.max(point.lat);
            max.lon = max.lon.max(point.lon);
        }
        Some((min, max))
    }

    /// Boundary-inclusive containment test.
    pub fn contains(&self, point: &Point) -> bool {
        match self.points.len() {
            0..=2 => false,
            3 => self.triangle_contains(point),
            _ => self.ray_cast_contains(point),
        }
    }

    // A point is inside a triangle iff it lies within the angle at every vertex.
    fn triangle_contains(&self, point: &Point) -> bool {
        let [a, b, c] = [self.points[0], self.points[1], self.points[2]];
        let at = |vertex: Point, first: Point, second: Point| {
            is_inside_of_angle(
                (first - vertex).unit(),
                (*point - vertex).unit(),
                (second - vertex).unit(),
            )
        };
        at(a, b, c) && at(b, a, c) && at(c, a, b)
    }

    fn ray_cast_contains(&self, point: &Point) -> bool {
        let n = self.points.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if on_segment(pi, pj, *point) {
                return true;
            }
            if (pi.lat > point.lat) != (pj.lat > point.lat) {
                let lon_cross = (pj.lon - pi.lon) * (point.lat - pi.lat) / (pj.lat - pi.lat) + pi.lon;
                if point.lon < lon_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let scale = (b - a).norm().max(f64::EPSILON);
    if (cross_product(b - a, p - a) / scale).abs() > 1e-12 {
        return false;
    }
    p.lat >= a.lat.min(b.lat)
        && p.lat <= a.lat.max(b.lat)
        && p.lon >= a.lon.min(b.lon)
        && p.lon <= a.lon.max(b.lon)
}

/// Calculate distance between two points in meters using the haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

// ==== WKT encoding ====
// The storage collaborator serializes coordinates as WKT with lon before lat.

fn wkt_body<'a>(input: &'a str, tag: &str) -> Result<&'a str, GeometryError> {
    let trimmed = input.trim();
    let invalid = || GeometryError::Format(input.to_string());
    let rest = trimmed.strip_prefix(tag).ok_or_else(invalid)?.trim_start();
    let rest = rest.strip_prefix('(').ok_or_else(invalid)?;
    let end = rest.find(')').ok_or_else(invalid)?;
    Ok(&rest[..end])
}

fn wkt_numbers(body: &str, expected: usize, input: &str) -> Result<Vec<f64>, GeometryError> {
    let numbers = body
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| GeometryError::Format(input.to_string()))?;
    if numbers.len() != expected {
        return Err(GeometryError::Format(input.to_string()));
    }
    Ok(numbers)
}

impl FromStr for Point {
    type Err = GeometryError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let body = wkt_body(input, "POINT")?;
        let n = wkt_numbers(body, 2, input)?;
        Ok(Point::new(n[1], n[0]))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POINT({} {})", self.lon, self.lat)
    }
}

impl FromStr for Segment {
    type Err = GeometryError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let body = wkt_body(input, "LINESTRING")?;
        let n = wkt_numbers(body, 4, input)?;
        Ok(Segment::new(Point::new(n[1], n[0]), Point::new(n[3], n[2])))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LINESTRING({} {}, {} {})",
            self.start.lon, self.start.lat, self.end.lon, self.end.lat
        )
    }
}

/// Serde adapter storing a [`Point`] as a WKT string.
pub mod wkt {
    use super::Point;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(point: &Point, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(point)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Point, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
