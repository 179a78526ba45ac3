// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::pipeline::OpportunityStatus;

// Visão agregada do funil, um bloco por status.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStageSummary {
    pub status: OpportunityStatus,
    #[schema(example = 4)]
    pub count: i64,
    #[schema(example = "12400.00")]
    pub amount: Decimal,
    #[schema(example = "6200.00")]
    pub weighted_amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub stages: Vec<PipelineStageSummary>,
    // Apenas os status abertos entram nos agregados de previsão
    #[schema(example = 9)]
    pub open_count: i64,
    #[schema(example = "31000.00")]
    pub open_amount: Decimal,
    #[schema(example = "14650.00")]
    pub open_weighted_amount: Decimal,
}
