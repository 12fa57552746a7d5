use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use adrift_types::api::DredgeRequest;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// Re-read a memorial's full content. Logged, participant-only, throttled
/// per (bottle, user). `dredge` and `dredge_by_id` are the same operation
/// behind two routes; clients of the original surface used both.
pub async fn dredge(
    State(state): State<AppState>,
    Path(bottle_id): Path<i64>,
    Json(req): Json<DredgeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let res = blocking(&state, move |svc| svc.dredge(bottle_id, &req.user)).await?;
    Ok(Json(res))
}

pub async fn dredge_by_id(
    State(state): State<AppState>,
    Path(bottle_id): Path<i64>,
    Json(req): Json<DredgeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let res = blocking(&state, move |svc| svc.dredge(bottle_id, &req.user)).await?;
    Ok(Json(res))
}
