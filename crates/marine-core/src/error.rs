//! Error types for route scanning and grid routing.

use thiserror::Error;

/// Convenient result alias for the marine core.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A required ship or route field was not supplied.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Input was present but unusable (e.g. a route with one waypoint).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The hazard collaborator failed to answer a query.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Malformed serialized geometry or a degenerate shape.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// The routing lattice would exceed its configured caps.
    #[error("routing lattice too large: {what} is {actual}, limit {limit}")]
    SizeLimit {
        what: &'static str,
        actual: u64,
        limit: u64,
    },

    /// The search exhausted every reachable lattice point without popping the target.
    #[error("destination lattice point {to} is unreachable from {from}")]
    UnreachableDestination { from: usize, to: usize },

    /// The requested cost model has no scorer yet.
    #[error("score type {0} is not supported")]
    UnsupportedScoreType(String),
}

/// Geometry failures.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// A WKT string could not be decoded.
    #[error("invalid wkt string {0:?}")]
    Format(String),

    #[error("polygon needs at least 3 points, got {points}")]
    DegeneratePolygon { points: usize },

    #[error("no lattice points fall inside the polygon")]
    EmptyLattice,
}

/// Failures raised by a hazard source.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to decode hazard data: {0}")]
    Decode(String),

    #[error("forecast {0} not found")]
    UnknownForecast(i64),

    /// Catch-all for backends that report errors as text.
    #[error("hazard backend failure: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Decode(err.to_string())
    }
}
