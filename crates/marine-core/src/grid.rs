//! Routing lattice: polygon interior sampled on a regular degree grid with
//! 8-connectivity.

use crate::error::{Error, GeometryError, Result};
use crate::geom::{Point, Polygon};
use crate::settings::GridLimits;
use std::collections::HashMap;

type Cell = (i64, i64);

const NEIGHBOR_OFFSETS: [Cell; 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone)]
pub struct FindRouteGrid {
    points: Vec<Point>,
    adjacency: Vec<Vec<usize>>,
}

impl FindRouteGrid {
    /// Lattice of every `step`-spaced point inside `polygon`.
    ///
    /// Lattice coordinates are `floor(lon / step)` and `floor(lat / step)`.
    /// Fails with [`Error::SizeLimit`] before allocating when the bounding
    /// box exceeds `limits`.
    pub fn new(polygon: &Polygon, step: f64, limits: GridLimits) -> Result<Self> {
        polygon.validate()?;
        if !(step.is_finite() && step > 0.0) {
            return Err(Error::InvalidInput(format!(
                "grid step must be positive, got {step}"
            )));
        }

        let cells: Vec<Cell> = polygon
            .points
            .iter()
            .map(|p| to_cell(p, step))
            .collect::<Result<_>>()?;
        let (min_x, max_x, min_y, max_y) = cells.iter().fold(
            (i64::MAX, i64::MIN, i64::MAX, i64::MIN),
            |(min_x, max_x, min_y, max_y), &(x, y)| {
                (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
            },
        );

        let width = axis_len(min_x, max_x);
        let height = axis_len(min_y, max_y);
        check_limit("lattice width", width, limits.max_axis_cells)?;
        check_limit("lattice height", height, limits.max_axis_cells)?;
        check_limit(
            "lattice candidates",
            width.saturating_mul(height),
            limits.max_vertices,
        )?;

        let mut ids: HashMap<Cell, usize> = HashMap::new();
        let mut lattice: Vec<Cell> = Vec::new();
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                if lattice_contains(&cells, (x, y)) {
                    ids.insert((x, y), lattice.len());
                    lattice.push((x, y));
                }
            }
        }
        check_limit("lattice vertices", lattice.len() as u64, limits.max_vertices)?;
        if lattice.is_empty() {
            return Err(GeometryError::EmptyLattice.into());
        }

        let adjacency = lattice
            .iter()
            .map(|&(x, y)| {
                NEIGHBOR_OFFSETS
                    .iter()
                    .filter_map(|(dx, dy)| ids.get(&(x + dx, y + dy)).copied())
                    .collect()
            })
            .collect();
        let points = lattice
            .iter()
            .map(|&(x, y)| Point::new(y as f64 * step, x as f64 * step))
            .collect();

        tracing::debug!(
            "Built routing lattice: {} of {} candidates inside polygon",
            lattice.len(),
            width * height
        );
        Ok(Self {
            points,
            adjacency,
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, id: usize) -> Option<Point> {
        self.points.get(id).copied()
    }

    pub fn neighbors(&self, id: usize) -> &[usize] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lattice point with the smallest haversine distance to `point`.
    pub fn closest_point_id(&self, point: &Point) -> usize {
        self.points
            .iter()
            .enumerate()
            .map(|(id, p)| (id, p.haversine(point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0, |(id, _)| id)
    }
}

fn to_cell(point: &Point, step: f64) -> Result<Cell> {
    let x = (point.lon / step).floor();
    let y = (point.lat / step).floor();
    if !x.is_finite() || !y.is_finite() || x.abs() > 1e15 || y.abs() > 1e15 {
        return Err(Error::InvalidInput(format!(
            "polygon point ({}, {}) out of lattice range",
            point.lat, point.lon
        )));
    }
    Ok((x as i64, y as i64))
}

fn axis_len(min: i64, max: i64) -> u64 {
    (i128::from(max) - i128::from(min) + 1) as u64
}

fn check_limit(what: &'static str, actual: u64, limit: u64) -> Result<()> {
    if actual > limit {
        return Err(Error::SizeLimit {
            what,
            actual,
            limit,
        });
    }
    Ok(())
}

/// Ray casting on integer lattice coordinates. Vertices and every edge,
/// horizontal ones included, count as inside.
fn lattice_contains(polygon: &[Cell], p: Cell) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if on_edge((xi, yi), (xj, yj), p) {
            return true;
        }
        if (yi > p.1) != (yj > p.1) {
            let x_cross = (xj - xi) as f64 * (p.1 - yi) as f64 / (yj - yi) as f64 + xi as f64;
            if x_cross > p.0 as f64 {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn on_edge(a: Cell, b: Cell, p: Cell) -> bool {
    let cross = i128::from(b.0 - a.0) * i128::from(p.1 - a.1)
        - i128::from(b.1 - a.1) * i128::from(p.0 - a.0);
    cross == 0
        && p.0 >= a.0.min(b.0)
        && p.0 <= a.0.max(b.0)
        && p.1 >= a.1.min(b.1)
        && p.1 <= a.1.max(b.1)
}
