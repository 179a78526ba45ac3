// src/handlers/dashboard.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::dashboard::PipelineSummary,
};

// GET /api/dashboard/pipeline
#[utoipa::path(
    get,
    path = "/api/dashboard/pipeline",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Funil agregado por status com previsão ponderada", body = PipelineSummary),
        (status = 401, description = "Ator não identificado")
    ),
    security(("actor_id" = []))
)]
pub async fn get_pipeline_summary(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state
        .dashboard_service
        .pipeline_summary(&app_state.db_pool)
        .await?;
    Ok((StatusCode::OK, Json(summary)))
}
