// src/handlers/orders.rs

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
    models::orders::{
        CreateOrderPayload, Order, OrderDetail, OrderLine, OrderStatus, OrderTransitionPayload,
        OrderWithNames, UpdateOrderPayload,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Pedidos ordenados do mais recente", body = [OrderWithNames])
    ),
    security(("actor_id" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let orders = app_state
        .order_service
        .list(&app_state.db_pool, query.status)
        .await?;
    Ok((StatusCode::OK, Json(orders)))
}

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pedido manual criado em BROUILLON", body = Order),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("actor_id" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = app_state
        .order_service
        .create(&app_state.db_pool, &user, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Detalhe com linhas", body = OrderDetail),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("actor_id" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .order_service
        .get_detail(&app_state.db_pool, id)
        .await?;
    Ok((StatusCode::OK, Json(detail)))
}

// PATCH /api/orders/{id}
#[utoipa::path(
    patch,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = UpdateOrderPayload,
    responses(
        (status = 200, description = "Pedido atualizado, totais re-derivados", body = Order),
        (status = 409, description = "Pedido entregue ou cancelado")
    ),
    security(("actor_id" = []))
)]
pub async fn update_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = app_state
        .order_service
        .patch(&app_state.db_pool, &user, id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(order)))
}

// POST /api/orders/{id}/transition
#[utoipa::path(
    post,
    path = "/api/orders/{id}/transition",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = OrderTransitionPayload,
    responses(
        (status = 200, description = "Status avançado na cadeia de preparo", body = Order),
        (status = 409, description = "Pulo de etapa ou pedido travado")
    ),
    security(("actor_id" = []))
)]
pub async fn transition_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderTransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state
        .order_service
        .transition(&app_state.db_pool, &user, id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(order)))
}

// =============================================================================
//  LINHAS
// =============================================================================

// POST /api/orders/{id}/lines
#[utoipa::path(
    post,
    path = "/api/orders/{id}/lines",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = AddLinePayload,
    responses(
        (status = 201, description = "Linha adicionada, totais re-derivados", body = OrderLine),
        (status = 422, description = "Item de catálogo inativo")
    ),
    security(("actor_id" = []))
)]
pub async fn add_order_line(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddLinePayload>,
) -> Result<impl IntoResponse, AppError> {
    let line = app_state
        .order_service
        .add_line(&app_state.db_pool, &user, id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(line)))
}

// PATCH /api/orders/{id}/lines/{line_id}
#[utoipa::path(
    patch,
    path = "/api/orders/{id}/lines/{line_id}",
    tag = "Orders",
    params(
        ("id" = Uuid, Path, description = "ID do pedido"),
        ("line_id" = Uuid, Path, description = "ID da linha")
    ),
    request_body = UpdateLineQuantityPayload,
    responses(
        (status = 200, description = "Quantidade atualizada", body = OrderLine),
        (status = 404, description = "Linha não encontrada")
    ),
    security(("actor_id" = []))
)]
pub async fn update_order_line(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateLineQuantityPayload>,
) -> Result<impl IntoResponse, AppError> {
    let line = app_state
        .order_service
        .update_line_quantity(&app_state.db_pool, &user, id, line_id, payload.quantity)
        .await?;
    Ok((StatusCode::OK, Json(line)))
}

// DELETE /api/orders/{id}/lines/{line_id}
#[utoipa::path(
    delete,
    path = "/api/orders/{id}/lines/{line_id}",
    tag = "Orders",
    params(
        ("id" = Uuid, Path, description = "ID do pedido"),
        ("line_id" = Uuid, Path, description = "ID da linha")
    ),
    responses(
        (status = 204, description = "Linha removida, totais re-derivados"),
        (status = 404, description = "Linha não encontrada")
    ),
    security(("actor_id" = []))
)]
pub async fn remove_order_line(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .order_service
        .remove_line(&app_state.db_pool, &user, id, line_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
