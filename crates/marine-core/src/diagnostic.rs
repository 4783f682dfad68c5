//! Scan results: hazard points and the overall route verdict.

use crate::geom::Point;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    Depth,
    HighWaves,
}

/// A flagged danger along the route. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticHazardPoint {
    location: Point,
    check_time: DateTime<Utc>,
    expected_time: DateTime<Utc>,
    kind: HazardKind,
    reason: String,
}

impl DiagnosticHazardPoint {
    pub fn new(
        location: Point,
        check_time: DateTime<Utc>,
        expected_time: DateTime<Utc>,
        kind: HazardKind,
        reason: String,
    ) -> Self {
        Self {
            location,
            check_time,
            expected_time,
            kind,
            reason,
        }
    }

    pub fn location(&self) -> Point {
        self.location
    }

    /// Wall-clock time of the scan that produced this point.
    pub fn check_time(&self) -> DateTime<Utc> {
        self.check_time
    }

    /// Predicted time the ship reaches the hazard.
    pub fn expected_time(&self) -> DateTime<Utc> {
        self.expected_time
    }

    pub fn kind(&self) -> HazardKind {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for DiagnosticHazardPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hazard at ({:.5}, {:.5}) checked at {}, expected trouble at {}: {}",
            self.location.lat,
            self.location.lon,
            self.check_time.format(TIME_FORMAT),
            self.expected_time.format(TIME_FORMAT),
            self.reason
        )
    }
}

pub fn make_depth_hazard(
    location: Point,
    check_time: DateTime<Utc>,
    expected_time: DateTime<Utc>,
    depth: f64,
) -> DiagnosticHazardPoint {
    DiagnosticHazardPoint::new(
        location,
        check_time,
        expected_time,
        HazardKind::Depth,
        format!("dangerous depth {depth}"),
    )
}

pub fn make_high_waves_hazard(
    location: Point,
    check_time: DateTime<Utc>,
    expected_time: DateTime<Utc>,
    height: f64,
) -> DiagnosticHazardPoint {
    DiagnosticHazardPoint::new(
        location,
        check_time,
        expected_time,
        HazardKind::HighWaves,
        format!("dangerous wave height {height}"),
    )
}

/// Drop points closer than `min_separation_m` to the last kept one.
pub fn collapse_hazards(
    points: Vec<DiagnosticHazardPoint>,
    min_separation_m: f64,
) -> Vec<DiagnosticHazardPoint> {
    let mut kept: Vec<DiagnosticHazardPoint> = Vec::with_capacity(points.len());
    for point in points {
        let far_enough = match kept.last() {
            Some(last) => last.location.haversine(&point.location) >= min_separation_m,
            None => true,
        };
        if far_enough {
            kept.push(point);
        }
    }
    kept
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStatus {
    Ok,
    Warning,
}

/// Outcome of one scan. `Ok` exactly when no hazard was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteValidateDiagnostic {
    status: DiagnosticStatus,
    hazard_points: Vec<DiagnosticHazardPoint>,
}

impl RouteValidateDiagnostic {
    pub fn from_hazards(hazard_points: Vec<DiagnosticHazardPoint>) -> Self {
        let status = if hazard_points.is_empty() {
            DiagnosticStatus::Ok
        } else {
            DiagnosticStatus::Warning
        };
        Self {
            status,
            hazard_points,
        }
    }

    pub fn ok() -> Self {
        Self::from_hazards(Vec::new())
    }

    pub fn status(&self) -> DiagnosticStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == DiagnosticStatus::Ok
    }

    pub fn hazard_points(&self) -> &[DiagnosticHazardPoint] {
        &self.hazard_points
    }
}

impl fmt::Display for RouteValidateDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hazard_points.is_empty() {
            return write!(f, "OK");
        }
        for (idx, point) in self.hazard_points.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{point}")?;
        }
        Ok(())
    }
}
