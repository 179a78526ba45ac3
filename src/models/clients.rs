// src/models/clients.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Diretório de clientes. Este motor só consome: a gestão do cadastro vive em outro módulo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440010")]
    pub id: Uuid,
    #[schema(example = "Jean Martin")]
    pub name: String,
    #[schema(example = "Vignobles Martin SARL")]
    pub organization: Option<String>,
    pub created_at: DateTime<Utc>,
}
