use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use adrift_types::api::{ReleaseAllResponse, ReleaseResponse};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn release_hold(
    State(state): State<AppState>,
    Path(hold_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |svc| svc.release_hold(hold_id)).await?;
    Ok(Json(ReleaseResponse { ok: true }))
}

pub async fn release_all_for_player(
    State(state): State<AppState>,
    Path(player): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let released = blocking(&state, move |svc| svc.release_all(&player)).await?;
    Ok(Json(ReleaseAllResponse { released }))
}
