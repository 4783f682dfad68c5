//! Route scanner endpoints.

use axum::{extract::State, http::StatusCode, Json};
use marine_core::{PathData, RouteSample, RouteScanner, RouteValidateDiagnostic};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ShowFlag {
    pub show: bool,
}

/// A diagnostic together with its rendered text.
#[derive(Debug, Serialize)]
pub struct DiagnosticView {
    #[serde(flatten)]
    pub diagnostic: RouteValidateDiagnostic,
    pub message: String,
}

impl From<RouteValidateDiagnostic> for DiagnosticView {
    fn from(diagnostic: RouteValidateDiagnostic) -> Self {
        let message = diagnostic.to_string();
        Self {
            diagnostic,
            message,
        }
    }
}

/// Run a scanner call on the blocking pool. Every accessor waits on the
/// scanner lock, which a running scan holds for its whole duration.
async fn with_scanner<T, F>(state: Arc<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&RouteScanner) -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(move || f(&state.scanner)).await?)
}

pub async fn set_path(
    State(state): State<Arc<AppState>>,
    Json(path): Json<PathData>,
) -> Result<StatusCode, ApiError> {
    tracing::info!(
        "Path set: {} waypoints, departing {}",
        path.route.waypoints().len(),
        path.depart_time
    );
    with_scanner(state, move |scanner| scanner.set_path_data(path)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_path(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<PathData>>, ApiError> {
    Ok(Json(with_scanner(state, RouteScanner::path_data).await?))
}

pub async fn set_show(
    State(state): State<Arc<AppState>>,
    Json(flag): Json<ShowFlag>,
) -> Result<StatusCode, ApiError> {
    with_scanner(state, move |scanner| scanner.set_show(flag.show)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_show(State(state): State<Arc<AppState>>) -> Result<Json<ShowFlag>, ApiError> {
    let show = with_scanner(state, RouteScanner::is_show).await?;
    Ok(Json(ShowFlag { show }))
}

/// Rescan the stored path. `null` when the scan could not run.
pub async fn cross_detect(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<DiagnosticView>>, ApiError> {
    let diagnostic = with_scanner(state, RouteScanner::cross_detect).await?;
    Ok(Json(diagnostic.map(DiagnosticView::from)))
}

/// Last stored diagnostic. `null` when never scanned or the last scan failed.
pub async fn get_diagnostic(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<DiagnosticView>>, ApiError> {
    let diagnostic = with_scanner(state, RouteScanner::diagnostic).await?;
    Ok(Json(diagnostic.map(DiagnosticView::from)))
}

pub async fn get_samples(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RouteSample>>, ApiError> {
    Ok(Json(with_scanner(state, RouteScanner::last_samples).await?))
}
