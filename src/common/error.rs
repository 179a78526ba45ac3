// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Todas as variantes são recuperáveis pelo chamador: nenhuma derruba o processo.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Validação (o chamador corrige a entrada e reenvia) ---
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("A quantidade deve ser um inteiro maior ou igual a 1")]
    InvalidQuantity,

    #[error("O conteúdo da nota não pode ser vazio")]
    EmptyContent,

    #[error("Informe o motivo da perda para marcar a oportunidade como PERDU")]
    LostReasonRequired,

    #[error("O motivo AUTRE exige um comentário explicando a perda")]
    CommentRequired,

    #[error("Filtro de timeline desconhecido: {0}")]
    UnknownFilter(String),

    // --- Estado (conflito com o estado atual da entidade; re-buscar e decidir) ---
    #[error("A oportunidade está em um status terminal e não pode ser editada")]
    OpportunityLocked,

    #[error("As linhas e valores deste registro estão congelados")]
    ImmutableState,

    #[error("Somente oportunidades GAGNE podem ser convertidas em pedido")]
    NotWon,

    #[error("A oportunidade não tem nenhuma linha para converter")]
    NoLines,

    #[error("Esta oportunidade já foi convertida em pedido")]
    AlreadyConverted,

    #[error("Linha não encontrada")]
    LineNotFound,

    #[error("Transição de status inválida: {0}")]
    InvalidStatusTransition(String),

    // --- Autorização ---
    #[error("Seu perfil não permite esta operação")]
    Forbidden,

    #[error("Cabeçalho x-user-id ausente ou sem usuário ativo correspondente")]
    InvalidActor,

    // --- Referências (o chamador precisa re-resolver o que apontou) ---
    #[error("O item de catálogo está inativo e não pode ser adicionado")]
    ItemInactive,

    #[error("Usuário não encontrado ou não elegível")]
    UserNotFound,

    #[error("{0} não encontrado(a)")]
    ResourceNotFound(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    // Código estável que o frontend usa para escolher a mensagem/ação específica.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION",
            AppError::InvalidQuantity => "INVALID_QUANTITY",
            AppError::EmptyContent => "EMPTY_CONTENT",
            AppError::LostReasonRequired => "LOST_REASON_REQUIRED",
            AppError::CommentRequired => "COMMENT_REQUIRED",
            AppError::UnknownFilter(_) => "UNKNOWN_FILTER",
            AppError::OpportunityLocked => "OPPORTUNITY_LOCKED",
            AppError::ImmutableState => "IMMUTABLE_STATE",
            AppError::NotWon => "NOT_WON",
            AppError::NoLines => "NO_LINES",
            AppError::AlreadyConverted => "ALREADY_CONVERTED",
            AppError::LineNotFound => "LINE_NOT_FOUND",
            AppError::InvalidStatusTransition(_) => "INVALID_STATUS_TRANSITION",
            AppError::Forbidden => "FORBIDDEN",
            AppError::InvalidActor => "INVALID_ACTOR",
            AppError::ItemInactive => "ITEM_INACTIVE",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::ResourceNotFound(_) => "RESOURCE_NOT_FOUND",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidQuantity
            | AppError::EmptyContent
            | AppError::LostReasonRequired
            | AppError::CommentRequired
            | AppError::UnknownFilter(_) => StatusCode::BAD_REQUEST,

            AppError::OpportunityLocked
            | AppError::ImmutableState
            | AppError::NotWon
            | AppError::NoLines
            | AppError::AlreadyConverted
            | AppError::InvalidStatusTransition(_) => StatusCode::CONFLICT,

            AppError::LineNotFound
            | AppError::UserNotFound
            | AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,

            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidActor => StatusCode::UNAUTHORIZED,
            AppError::ItemInactive => StatusCode::UNPROCESSABLE_ENTITY,

            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Retornamos todos os detalhes da validação, campo a campo.
        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "error": "Um ou mais campos são inválidos.",
                "code": self.code(),
                "details": details,
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        let status = self.status();

        // Erros de infraestrutura viram 500 com corpo genérico.
        // O `tracing` loga a mensagem detalhada que o `thiserror` nos deu.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro interno do servidor: {:?}", self);
            "Ocorreu um erro inesperado.".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "error": message, "code": self.code() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erros_de_estado_respondem_conflito() {
        assert_eq!(AppError::AlreadyConverted.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotWon.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::OpportunityLocked.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn codigo_e_estavel_por_variante() {
        assert_eq!(AppError::LostReasonRequired.code(), "LOST_REASON_REQUIRED");
        assert_eq!(AppError::Forbidden.code(), "FORBIDDEN");
        assert_eq!(AppError::ItemInactive.code(), "ITEM_INACTIVE");
    }
}
