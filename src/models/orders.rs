// src/models/orders.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::models::ledger::{self, ItemType, LedgerLine};

// --- Enums ---

// Cadeia de preparo: BROUILLON → VALIDEE → PREPARATION → EXPEDIEE → LIVREE,
// com ANNULEE como saída lateral de qualquer estado aberto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Brouillon,
    Validee,
    Preparation,
    Expediee,
    Livree,
    Annulee,
}

impl OrderStatus {
    // Entregue ou cancelado: linhas e overlay manual ficam congelados.
    pub fn is_locked(&self) -> bool {
        matches!(self, OrderStatus::Livree | OrderStatus::Annulee)
    }

    fn next_in_chain(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Brouillon => Some(OrderStatus::Validee),
            OrderStatus::Validee => Some(OrderStatus::Preparation),
            OrderStatus::Preparation => Some(OrderStatus::Expediee),
            OrderStatus::Expediee => Some(OrderStatus::Livree),
            OrderStatus::Livree | OrderStatus::Annulee => None,
        }
    }
}

// A cadeia avança um passo por vez; pular etapa é erro do chamador.
pub fn check_order_transition(current: OrderStatus, next: OrderStatus) -> Result<(), AppError> {
    if current.is_locked() {
        return Err(AppError::ImmutableState);
    }
    if next == OrderStatus::Annulee {
        return Ok(());
    }
    if current.next_in_chain() == Some(next) {
        return Ok(());
    }
    Err(AppError::InvalidStatusTransition(format!(
        "{:?} não avança para {:?}",
        current, next
    )))
}

// Referência legível e monotônica, ex.: CMD-2026-00057.
pub fn format_reference(year: i32, seq: i64) -> String {
    format!("CMD-{}-{:05}", year, seq)
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "CMD-2026-00057")]
    pub reference: String,
    pub client_id: Uuid,
    pub owner_id: Uuid,
    // Preenchido uma única vez quando o pedido nasce de uma conversão
    pub opportunity_id: Option<Uuid>,
    pub status: OrderStatus,
    #[schema(example = "0.20")]
    pub tax_rate: Decimal,
    #[schema(example = "4900.00")]
    pub total_ht: Decimal,
    #[schema(example = "5880.00")]
    pub total_ttc: Decimal,
    #[schema(example = "250.00")]
    pub manual_amount: Decimal,
    pub expected_delivery: Option<NaiveDate>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub validated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn ensure_mutable(&self) -> Result<(), AppError> {
        if self.status.is_locked() {
            return Err(AppError::ImmutableState);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_type: ItemType,
    pub item_id: Uuid,
    #[schema(example = "Cuve inox 500L")]
    pub product_name: String,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(example = "1250.00")]
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl LedgerLine for OrderLine {
    fn line_id(&self) -> Uuid {
        self.id
    }
    fn quantity(&self) -> i32 {
        self.quantity
    }
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
}

// --- Read models ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithNames {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub order: Order,
    #[schema(example = "Jean Martin")]
    pub client_name: String,
    #[schema(example = "Marie Dupont")]
    pub owner_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    #[serde(flatten)]
    pub line: OrderLine,
    #[schema(example = "2500.00")]
    pub total: Decimal,
}

impl From<OrderLine> for OrderLineView {
    fn from(line: OrderLine) -> Self {
        let total = ledger::line_total(line.quantity, line.unit_price);
        OrderLineView { line, total }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub header: OrderWithNames,
    pub lines: Vec<OrderLineView>,
}

impl OrderDetail {
    pub fn assemble(header: OrderWithNames, lines: Vec<OrderLine>) -> Self {
        OrderDetail {
            header,
            lines: lines.into_iter().map(OrderLineView::from).collect(),
        }
    }
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub client_id: Uuid,
    pub manual_amount: Option<Decimal>,
    pub expected_delivery: Option<NaiveDate>,
    #[schema(example = "0.20")]
    pub tax_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderPayload {
    pub expected_delivery: Option<NaiveDate>,
    pub tracking_number: Option<String>,
    pub manual_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderTransitionPayload {
    pub status: OrderStatus,
    #[schema(example = "COLIS-889042")]
    pub tracking_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OrderStatus::Brouillon, OrderStatus::Validee)]
    #[case(OrderStatus::Validee, OrderStatus::Preparation)]
    #[case(OrderStatus::Preparation, OrderStatus::Expediee)]
    #[case(OrderStatus::Expediee, OrderStatus::Livree)]
    fn cadeia_avanca_um_passo(#[case] from: OrderStatus, #[case] to: OrderStatus) {
        assert!(check_order_transition(from, to).is_ok());
    }

    #[rstest]
    #[case(OrderStatus::Brouillon)]
    #[case(OrderStatus::Validee)]
    #[case(OrderStatus::Preparation)]
    #[case(OrderStatus::Expediee)]
    fn cancelamento_sai_de_qualquer_estado_aberto(#[case] from: OrderStatus) {
        assert!(check_order_transition(from, OrderStatus::Annulee).is_ok());
    }

    #[rstest]
    #[case(OrderStatus::Brouillon, OrderStatus::Preparation)]
    #[case(OrderStatus::Brouillon, OrderStatus::Livree)]
    #[case(OrderStatus::Validee, OrderStatus::Brouillon)]
    #[case(OrderStatus::Expediee, OrderStatus::Validee)]
    #[case(OrderStatus::Validee, OrderStatus::Validee)]
    fn pular_ou_voltar_etapa_e_rejeitado(#[case] from: OrderStatus, #[case] to: OrderStatus) {
        let err = check_order_transition(from, to).unwrap_err();
        assert!(matches!(err, AppError::InvalidStatusTransition(_)));
    }

    #[rstest]
    #[case(OrderStatus::Livree, OrderStatus::Annulee)]
    #[case(OrderStatus::Annulee, OrderStatus::Brouillon)]
    #[case(OrderStatus::Livree, OrderStatus::Livree)]
    fn estado_travado_nao_transiciona(#[case] from: OrderStatus, #[case] to: OrderStatus) {
        let err = check_order_transition(from, to).unwrap_err();
        assert!(matches!(err, AppError::ImmutableState));
    }

    #[rstest]
    #[case(OrderStatus::Brouillon, false)]
    #[case(OrderStatus::Expediee, false)]
    #[case(OrderStatus::Livree, true)]
    #[case(OrderStatus::Annulee, true)]
    fn entregue_e_cancelado_ficam_travados(#[case] status: OrderStatus, #[case] locked: bool) {
        assert_eq!(status.is_locked(), locked);
    }

    #[test]
    fn referencia_e_legivel_e_preenchida_com_zeros() {
        assert_eq!(format_reference(2026, 57), "CMD-2026-00057");
        assert_eq!(format_reference(2026, 1), "CMD-2026-00001");
        // sequências longas não são truncadas
        assert_eq!(format_reference(2027, 123456), "CMD-2027-123456");
    }
}
