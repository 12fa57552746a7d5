use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use adrift_types::api::{ApplyMoralityRequest, LimitsQuery, MoralityResponse};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn get_morality(
    State(state): State<AppState>,
    Path(player): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = player.clone();
    let morality = blocking(&state, move |svc| svc.get_morality(&player)).await?;
    Ok(Json(MoralityResponse { id, morality }))
}

pub async fn apply_morality(
    State(state): State<AppState>,
    Path(player): Path<String>,
    Json(req): Json<ApplyMoralityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = player.clone();
    let morality = blocking(&state, move |svc| svc.apply_morality(&player, req.delta)).await?;
    Ok(Json(MoralityResponse { id, morality }))
}

pub async fn check_limits(
    State(state): State<AppState>,
    Query(query): Query<LimitsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let res = blocking(&state, move |svc| {
        svc.check_limits(&query.author, &query.ip)
    })
    .await?;
    Ok(Json(res))
}
