//! API routes for the marine server.

pub mod best_route;
pub mod error;
pub mod hazards;
mod routes;
pub mod scan;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    routes::create_router()
}
