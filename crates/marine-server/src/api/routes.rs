//! REST API routes.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::{best_route, hazards, scan};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        // Route scanner
        .route("/v1/scan/path", get(scan::get_path).put(scan::set_path))
        .route("/v1/scan/show", get(scan::get_show).put(scan::set_show))
        .route("/v1/scan/detect", post(scan::cross_detect))
        .route("/v1/scan/diagnostic", get(scan::get_diagnostic))
        .route("/v1/scan/samples", get(scan::get_samples))
        // Grid router
        .route("/v1/routes/best", post(best_route::make_best_route))
        // Hazard data
        .route("/v1/hazards/reload", post(hazards::reload_hazards))
        .route("/v1/hazards/safe-points", get(hazards::list_safe_points))
}
