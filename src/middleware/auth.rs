// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, models::users::User};

// Guarda de ator: o cabeçalho x-user-id identifica quem está operando.
// A emissão de sessão fica fora deste motor; aqui só resolvemos o id
// contra o diretório de usuários e exigimos que ele esteja ativo.
pub async fn actor_guard(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let raw = request
        .headers()
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::InvalidActor)?;

    let user_id = Uuid::parse_str(raw).map_err(|_| AppError::InvalidActor)?;

    let user = app_state
        .users_repo
        .find_active(user_id)
        .await?
        .ok_or(AppError::InvalidActor)?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Extrator para obter o ator autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::InvalidActor)
    }
}
