use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use adrift_types::api::{ReplyDirectRequest, ReplyRequest};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// Hold-gated reply to a specific bottle.
pub async fn reply_to_bottle(
    State(state): State<AppState>,
    Path(bottle_id): Path<i64>,
    Json(req): Json<ReplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let res = blocking(&state, move |svc| {
        svc.reply(bottle_id, &req.user, &req.content)
    })
    .await?;
    Ok(Json(res))
}

/// Reply-to id and content in one call.
pub async fn reply_direct(
    State(state): State<AppState>,
    Json(req): Json<ReplyDirectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let res = blocking(&state, move |svc| {
        svc.reply_direct(req.reply_to, &req.user, &req.content)
    })
    .await?;
    Ok(Json(res))
}
