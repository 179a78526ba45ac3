// src/handlers/timeline.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::timeline::{AddNotePayload, TimelineEntry},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct TimelineQuery {
    // "all", "notes-only" ou um discriminante como "STATUS_CHANGE"
    pub filter: Option<String>,
}

// GET /api/opportunities/{id}/timeline
#[utoipa::path(
    get,
    path = "/api/opportunities/{id}/timeline",
    tag = "Timeline",
    params(
        ("id" = Uuid, Path, description = "ID da oportunidade"),
        TimelineQuery
    ),
    responses(
        (status = 200, description = "Histórico do mais recente para o mais antigo", body = [TimelineEntry]),
        (status = 400, description = "Filtro desconhecido"),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("actor_id" = []))
)]
pub async fn get_timeline(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<TimelineQuery>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state
        .timeline_service
        .get_timeline(&app_state.db_pool, id, query.filter.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(entries)))
}

// POST /api/opportunities/{id}/notes
#[utoipa::path(
    post,
    path = "/api/opportunities/{id}/notes",
    tag = "Timeline",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    request_body = AddNotePayload,
    responses(
        (status = 201, description = "Nota registrada no histórico", body = TimelineEntry),
        (status = 400, description = "Conteúdo vazio")
    ),
    security(("actor_id" = []))
)]
pub async fn add_note(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddNotePayload>,
) -> Result<impl IntoResponse, AppError> {
    let entry = app_state
        .timeline_service
        .add_note(&app_state.db_pool, &user, id, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
