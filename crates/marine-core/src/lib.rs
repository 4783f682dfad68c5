pub mod depth;
pub mod diagnostic;
pub mod error;
pub mod forecast;
pub mod geom;
pub mod grid;
pub mod hazards;
pub mod route;
pub mod router;
pub mod scanner;
pub mod scorer;
pub mod settings;
pub mod ship;
pub mod store;

pub use depth::{DepthGrid, DepthGridData, DepthGridOverlay, DepthPoint};
pub use diagnostic::{
    DiagnosticHazardPoint, DiagnosticStatus, HazardKind, RouteValidateDiagnostic,
};
pub use error::{Error, GeometryError, Result, StorageError};
pub use forecast::{ForecastAccessor, ForecastCandidate, ForecastPoint};
pub use geom::{haversine_distance, Point, Polygon, Segment};
pub use grid::FindRouteGrid;
pub use hazards::{steering_cone_triangles, HazardSource, SafePoint};
pub use route::{Route, RoutePoint};
pub use router::{shortest_path, BestRouteInput, BestRouteMaker, BestRouteResult, LatticePath};
pub use scanner::{PathData, RouteSample, RouteScanner, ScanReport};
pub use scorer::{ScoreType, Scorer, TimeScorer};
pub use settings::{GridLimits, RouterSettings, ScanSettings};
pub use ship::{calculate_steering_angle, calculate_velocity_ratio, get_speed, ShipPerformanceInfo};
pub use store::{HazardSnapshot, MemoryHazardStore};
