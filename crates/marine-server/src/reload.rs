//! Background reload of the hazard snapshot.
//!
//! At most one reload runs at a time. A request that arrives while one is in
//! flight is rejected, never queued.

use marine_core::{HazardSnapshot, StorageError};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;

use crate::state::AppState;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("a hazard reload is already running")]
    Busy,

    #[error("no hazard snapshot is configured")]
    NotConfigured,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("reload task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Read `path` off the async runtime and swap it in as the live hazard source.
pub async fn load_snapshot(state: &AppState, path: PathBuf) -> Result<(), ReloadError> {
    let started = std::time::Instant::now();
    let source = tokio::task::spawn_blocking(move || {
        HazardSnapshot::from_json_file(&path).map(HazardSnapshot::into_source)
    })
    .await??;
    state.hazards.replace(source);
    tracing::info!("Hazard snapshot swapped in after {:?}", started.elapsed());
    Ok(())
}

/// Claim the reload slot and run the reload in the background.
pub fn start_reload(state: Arc<AppState>) -> Result<(), ReloadError> {
    let path = state
        .config
        .hazard_snapshot
        .clone()
        .ok_or(ReloadError::NotConfigured)?;
    if state
        .reload_in_flight
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return Err(ReloadError::Busy);
    }

    tokio::spawn(async move {
        if let Err(err) = load_snapshot(&state, path).await {
            tracing::error!("Hazard reload failed: {}", err);
        }
        state.reload_in_flight.store(false, Ordering::Release);
    });
    Ok(())
}
