//! Hazard data endpoints.

use axum::{extract::State, http::StatusCode, Json};
use marine_core::{HazardSource, SafePoint};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::reload;
use crate::state::AppState;

/// Start a snapshot reload. 202 when started, 409 while another is running.
pub async fn reload_hazards(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    reload::start_reload(state)?;
    tracing::info!("Hazard reload started");
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "reloading" }))))
}

/// List the registered safe points.
pub async fn list_safe_points(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SafePoint>>, ApiError> {
    let points = tokio::task::spawn_blocking(move || state.hazards.select_safe_points())
        .await?
        .map_err(marine_core::Error::from)?;
    Ok(Json(points))
}
