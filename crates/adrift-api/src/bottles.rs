use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use adrift_core::CoreError;
use adrift_core::bottles::CreateBottle;
use adrift_types::Area;
use adrift_types::api::{
    CreateBottleRequest, CreateBottleResponse, FishRequest, ListQuery, RetrieveRequest,
    RetrieveResponse,
};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn create_bottle(
    State(state): State<AppState>,
    Json(req): Json<CreateBottleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = blocking(&state, move |svc| {
        svc.create(&CreateBottle {
            author: &req.author,
            content: &req.content,
            kind: req.kind,
            tag: &req.tag,
            ip: &req.ip,
            name_send: req.name_send.as_deref(),
            item_id: req.item_id,
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(CreateBottleResponse { id })))
}

pub async fn fish_bottle(
    State(state): State<AppState>,
    Json(req): Json<FishRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let res = blocking(&state, move |svc| svc.fish(&req.player)).await?;
    Ok(Json(res))
}

pub async fn get_bottle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let (bottle, replies) = blocking(&state, move |svc| svc.get_bottle(id)).await?;
    Ok(Json(serde_json::json!({ "bottle": bottle, "replies": replies })))
}

pub async fn list_bottles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let area = match query.area.as_deref() {
        Some(s) => Some(
            s.parse::<Area>()
                .map_err(|e| ApiError(CoreError::InvalidInput(e)))?,
        ),
        None => None,
    };

    let bottles = blocking(&state, move |svc| {
        svc.list(area, query.author.as_deref(), query.limit, query.offset)
    })
    .await?;
    Ok(Json(bottles))
}

pub async fn retrieve_bottle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RetrieveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let morality = blocking(&state, move |svc| svc.retrieve(id, &req.author)).await?;
    Ok(Json(RetrieveResponse { ok: true, morality }))
}
