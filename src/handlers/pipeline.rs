// src/handlers/pipeline.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::ledger::{AddLinePayload, UpdateLineQuantityPayload},
    models::orders::Order,
    models::pipeline::{
        CreateOpportunityPayload, Opportunity, OpportunityDetail, OpportunityLine,
        OpportunityStatus, OpportunitySummary, ReassignPayload, TransitionPayload,
        UpdateOpportunityPayload,
    },
};

// =============================================================================
//  1. OPORTUNIDADES (CRUD + LISTA)
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListOpportunitiesQuery {
    pub owner_id: Option<Uuid>,
    pub status: Option<OpportunityStatus>,
}

// GET /api/opportunities
#[utoipa::path(
    get,
    path = "/api/opportunities",
    tag = "Pipeline",
    params(ListOpportunitiesQuery),
    responses(
        (status = 200, description = "Oportunidades com totais derivados", body = [OpportunitySummary]),
        (status = 401, description = "Ator não identificado")
    ),
    security(("actor_id" = []))
)]
pub async fn list_opportunities(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ListOpportunitiesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let summaries = app_state
        .pipeline_service
        .list(&app_state.db_pool, query.owner_id, query.status)
        .await?;
    Ok((StatusCode::OK, Json(summaries)))
}

// POST /api/opportunities
#[utoipa::path(
    post,
    path = "/api/opportunities",
    tag = "Pipeline",
    request_body = CreateOpportunityPayload,
    responses(
        (status = 201, description = "Oportunidade criada em NOUVEAU", body = Opportunity),
        (status = 403, description = "Perfil sem escrita no funil")
    ),
    security(("actor_id" = []))
)]
pub async fn create_opportunity(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateOpportunityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let opportunity = app_state
        .pipeline_service
        .create(&app_state.db_pool, &user, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(opportunity)))
}

// GET /api/opportunities/{id}
#[utoipa::path(
    get,
    path = "/api/opportunities/{id}",
    tag = "Pipeline",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    responses(
        (status = 200, description = "Detalhe com linhas e totais", body = OpportunityDetail),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("actor_id" = []))
)]
pub async fn get_opportunity(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .pipeline_service
        .get_detail(&app_state.db_pool, id)
        .await?;
    Ok((StatusCode::OK, Json(detail)))
}

// PATCH /api/opportunities/{id}
#[utoipa::path(
    patch,
    path = "/api/opportunities/{id}",
    tag = "Pipeline",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    request_body = UpdateOpportunityPayload,
    responses(
        (status = 200, description = "Oportunidade atualizada", body = Opportunity),
        (status = 409, description = "Oportunidade em status terminal")
    ),
    security(("actor_id" = []))
)]
pub async fn update_opportunity(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOpportunityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let opportunity = app_state
        .pipeline_service
        .update(&app_state.db_pool, &user, id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(opportunity)))
}

// DELETE /api/opportunities/{id}
#[utoipa::path(
    delete,
    path = "/api/opportunities/{id}",
    tag = "Pipeline",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    responses(
        (status = 204, description = "Oportunidade arquivada (soft delete)"),
        (status = 403, description = "Exclusão exige perfil gestor")
    ),
    security(("actor_id" = []))
)]
pub async fn delete_opportunity(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .pipeline_service
        .soft_delete(&app_state.db_pool, &user, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  2. TRANSIÇÃO, REATRIBUIÇÃO E CONVERSÃO
// =============================================================================

// POST /api/opportunities/{id}/transition
#[utoipa::path(
    post,
    path = "/api/opportunities/{id}/transition",
    tag = "Pipeline",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Status alterado", body = Opportunity),
        (status = 400, description = "Motivo de perda ausente ou incompleto"),
        (status = 409, description = "Transição inválida")
    ),
    security(("actor_id" = []))
)]
pub async fn transition_opportunity(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let opportunity = app_state
        .pipeline_service
        .transition(&app_state.db_pool, &user, id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(opportunity)))
}

// POST /api/opportunities/{id}/assign
#[utoipa::path(
    post,
    path = "/api/opportunities/{id}/assign",
    tag = "Pipeline",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    request_body = ReassignPayload,
    responses(
        (status = 200, description = "Dono alterado", body = Opportunity),
        (status = 403, description = "Reatribuição exige ADMIN ou RESPONSABLE_FILIERE"),
        (status = 404, description = "Novo dono não encontrado ou inelegível")
    ),
    security(("actor_id" = []))
)]
pub async fn reassign_opportunity(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReassignPayload>,
) -> Result<impl IntoResponse, AppError> {
    let opportunity = app_state
        .pipeline_service
        .reassign(&app_state.db_pool, &user, id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(opportunity)))
}

// POST /api/opportunities/{id}/convert
#[utoipa::path(
    post,
    path = "/api/opportunities/{id}/convert",
    tag = "Pipeline",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    responses(
        (status = 201, description = "Pedido criado a partir da oportunidade", body = Order),
        (status = 409, description = "Não ganha, sem linhas ou já convertida")
    ),
    security(("actor_id" = []))
)]
pub async fn convert_opportunity(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state
        .conversion_service
        .convert(&app_state.db_pool, &user, id)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

// =============================================================================
//  3. LINHAS
// =============================================================================

// POST /api/opportunities/{id}/lines
#[utoipa::path(
    post,
    path = "/api/opportunities/{id}/lines",
    tag = "Pipeline",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    request_body = AddLinePayload,
    responses(
        (status = 201, description = "Linha adicionada com preço congelado", body = OpportunityLine),
        (status = 422, description = "Item de catálogo inativo")
    ),
    security(("actor_id" = []))
)]
pub async fn add_opportunity_line(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddLinePayload>,
) -> Result<impl IntoResponse, AppError> {
    let line = app_state
        .pipeline_service
        .add_line(&app_state.db_pool, &user, id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(line)))
}

// PATCH /api/opportunities/{id}/lines/{line_id}
#[utoipa::path(
    patch,
    path = "/api/opportunities/{id}/lines/{line_id}",
    tag = "Pipeline",
    params(
        ("id" = Uuid, Path, description = "ID da oportunidade"),
        ("line_id" = Uuid, Path, description = "ID da linha")
    ),
    request_body = UpdateLineQuantityPayload,
    responses(
        (status = 200, description = "Quantidade atualizada", body = OpportunityLine),
        (status = 404, description = "Linha não encontrada")
    ),
    security(("actor_id" = []))
)]
pub async fn update_opportunity_line(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateLineQuantityPayload>,
) -> Result<impl IntoResponse, AppError> {
    let line = app_state
        .pipeline_service
        .update_line_quantity(&app_state.db_pool, &user, id, line_id, payload.quantity)
        .await?;
    Ok((StatusCode::OK, Json(line)))
}

// DELETE /api/opportunities/{id}/lines/{line_id}
#[utoipa::path(
    delete,
    path = "/api/opportunities/{id}/lines/{line_id}",
    tag = "Pipeline",
    params(
        ("id" = Uuid, Path, description = "ID da oportunidade"),
        ("line_id" = Uuid, Path, description = "ID da linha")
    ),
    responses(
        (status = 204, description = "Linha removida"),
        (status = 404, description = "Linha não encontrada")
    ),
    security(("actor_id" = []))
)]
pub async fn remove_opportunity_line(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .pipeline_service
        .remove_line(&app_state.db_pool, &user, id, line_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
