//! Best-route endpoint.

use axum::{extract::State, Json};
use marine_core::{BestRouteInput, BestRouteResult};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Search the lattice off the async runtime; large bounds take a while.
pub async fn make_best_route(
    State(state): State<Arc<AppState>>,
    Json(input): Json<BestRouteInput>,
) -> Result<Json<BestRouteResult>, ApiError> {
    let result =
        tokio::task::spawn_blocking(move || state.route_maker.make_best_route(&input)).await??;
    Ok(Json(result))
}
