//! Best-route search over a routing lattice.
//!
//! Edge costs are evaluated once, at the predicted arrival time of the edge's
//! source node. The result is optimal under those costs, which approximates a
//! fully time-dependent shortest path in a single pass.

use crate::error::{Error, Result};
use crate::geom::{Point, Polygon};
use crate::grid::FindRouteGrid;
use crate::hazards::HazardSource;
use crate::route::Route;
use crate::scorer::{ScoreType, Scorer, TimeScorer};
use crate::settings::RouterSettings;
use crate::ship::ShipPerformanceInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestRouteInput {
    /// Single-segment route: its start and end are the endpoints to connect.
    pub route: Route,
    pub bounds: Polygon,
    pub ship: ShipPerformanceInfo,
    pub depart_time: DateTime<Utc>,
    #[serde(default)]
    pub score_type: ScoreType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestRouteResult {
    pub points: Vec<Point>,
    pub arrival_time: DateTime<Utc>,
    /// Total cost in scorer units.
    pub score: i64,
}

/// Lattice path found by [`shortest_path`].
#[derive(Debug, Clone, PartialEq)]
pub struct LatticePath {
    pub point_ids: Vec<usize>,
    pub score: i64,
    pub arrival_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    score: i64,
    point_id: usize,
}

/// Dijkstra from `start` to `end`, stopping once `end` is settled.
///
/// Edges the scorer blocks are never relaxed.
pub fn shortest_path(
    grid: &FindRouteGrid,
    start: usize,
    end: usize,
    depart: DateTime<Utc>,
    scorer: &mut dyn Scorer,
) -> Result<LatticePath> {
    let n = grid.len();
    if start >= n || end >= n {
        return Err(Error::InvalidInput(format!(
            "lattice endpoints {start} -> {end} out of range for {n} points"
        )));
    }

    let mut best = vec![i64::MAX; n];
    let mut arrival = vec![depart; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut settled = vec![false; n];

    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    best[start] = 0;
    open_set.push(Reverse(OpenNode {
        score: 0,
        point_id: start,
    }));

    let mut nodes_visited = 0usize;
    while let Some(Reverse(current)) = open_set.pop() {
        let id = current.point_id;
        if settled[id] || current.score != best[id] {
            continue;
        }
        settled[id] = true;
        nodes_visited += 1;
        if id == end {
            break;
        }

        let depart_at = arrival[id];
        let neighbors = grid.neighbors(id);
        scorer.prefetch(id, neighbors, depart_at)?;
        for &next in neighbors {
            if settled[next] {
                continue;
            }
            let Some(edge) = scorer.score(id, next, depart_at)? else {
                continue;
            };
            let candidate = current.score.checked_add(edge).ok_or_else(|| {
                Error::InvalidInput(format!("route cost overflows at lattice point {next}"))
            })?;
            if candidate < best[next] {
                best[next] = candidate;
                prev[next] = Some(id);
                arrival[next] = scorer.arrival_time(id, next, depart_at)?;
                open_set.push(Reverse(OpenNode {
                    score: candidate,
                    point_id: next,
                }));
            }
        }
    }

    if !settled[end] {
        return Err(Error::UnreachableDestination {
            from: start,
            to: end,
        });
    }

    let mut point_ids = vec![end];
    let mut cursor = end;
    while let Some(p) = prev[cursor] {
        point_ids.push(p);
        cursor = p;
    }
    point_ids.reverse();

    tracing::debug!(
        "Shortest path settled {} of {} lattice points",
        nodes_visited,
        n
    );
    Ok(LatticePath {
        point_ids,
        score: best[end],
        arrival_time: arrival[end],
    })
}

/// Builds the lattice and scorer for a request and runs the search.
pub struct BestRouteMaker {
    hazards: Arc<dyn HazardSource>,
    settings: RouterSettings,
}

impl BestRouteMaker {
    pub fn new(hazards: Arc<dyn HazardSource>, settings: RouterSettings) -> Self {
        Self { hazards, settings }
    }

    pub fn make_scorer(
        &self,
        score_type: ScoreType,
        grid: &FindRouteGrid,
        ship: &ShipPerformanceInfo,
        depart_time: DateTime<Utc>,
    ) -> Result<Box<dyn Scorer>> {
        match score_type {
            ScoreType::Time => Ok(Box::new(TimeScorer::new(
                ship.clone(),
                grid.points().to_vec(),
                Arc::clone(&self.hazards),
                depart_time,
                &self.settings,
            )?)),
            ScoreType::Fuel => Err(Error::UnsupportedScoreType(score_type.to_string())),
        }
    }

    pub fn make_best_route(&self, input: &BestRouteInput) -> Result<BestRouteResult> {
        let [segment] = input.route.segments() else {
            return Err(Error::InvalidInput(format!(
                "best route needs a single-segment route, got {} segments",
                input.route.segments().len()
            )));
        };
        input.ship.nominal_speed()?;

        let grid = FindRouteGrid::new(
            &input.bounds,
            self.settings.grid_step_deg,
            self.settings.limits,
        )?;
        let start = grid.closest_point_id(&segment.start);
        let end = grid.closest_point_id(&segment.end);
        let mut scorer =
            self.make_scorer(input.score_type, &grid, &input.ship, input.depart_time)?;

        let path = shortest_path(&grid, start, end, input.depart_time, scorer.as_mut())?;
        let points: Vec<Point> = path.point_ids.iter().map(|&id| grid.points()[id]).collect();
        tracing::info!(
            "Best route over {} lattice points: {} hops, arrival {}",
            grid.len(),
            points.len().saturating_sub(1),
            path.arrival_time
        );
        Ok(BestRouteResult {
            points,
            arrival_time: path.arrival_time,
            score: path.score,
        })
    }
}
