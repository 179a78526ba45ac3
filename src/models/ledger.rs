// src/models/ledger.rs
//
// O "razão de linhas": toda aritmética monetária de oportunidades e pedidos
// passa por aqui. Os totais nunca são armazenados; recalculamos a cada
// leitura a partir das linhas, então não há como os valores divergirem.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::catalog::CatalogItem;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "item_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Product,
    Kit,
}

// --- Structs ---

// Linha recém-montada, ainda sem id: o repositório a persiste na tabela certa.
#[derive(Debug, Clone)]
pub struct LineDraft {
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

// Totais derivados de uma coleção de linhas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    #[schema(example = "4650.00")]
    pub line_total: Decimal,
    #[schema(example = "4900.00")]
    pub grand_total: Decimal,
}

// Linhas de oportunidade e de pedido têm a mesma forma monetária;
// este trait é o que o razão precisa enxergar de qualquer uma delas.
pub trait LedgerLine {
    fn line_id(&self) -> Uuid;
    fn quantity(&self) -> i32;
    fn unit_price(&self) -> Decimal;
}

// --- Payloads ---

// Mesmo formato para linhas de oportunidade e de pedido.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddLinePayload {
    pub item_type: ItemType,
    pub item_id: Uuid,
    #[schema(example = 2)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLineQuantityPayload {
    #[schema(example = 3)]
    pub quantity: i32,
}

// --- Operações ---

pub fn check_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::InvalidQuantity);
    }
    Ok(())
}

// Monta uma nova linha congelando o preço atual do catálogo.
pub fn build_line(
    item: &CatalogItem,
    item_type: ItemType,
    quantity: i32,
) -> Result<LineDraft, AppError> {
    if !item.is_active {
        return Err(AppError::ItemInactive);
    }
    check_quantity(quantity)?;
    Ok(LineDraft {
        item_type,
        item_id: item.id,
        product_name: item.name.clone(),
        quantity,
        unit_price: item.unit_price,
    })
}

pub fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
    unit_price * Decimal::from(quantity)
}

// Função pura e idempotente: chamada em toda leitura, nunca cacheada.
// Um overlay manual negativo conta como zero.
pub fn compute_totals<L: LedgerLine>(lines: &[L], manual_amount: Decimal) -> Totals {
    let line_sum: Decimal = lines
        .iter()
        .map(|l| line_total(l.quantity(), l.unit_price()))
        .sum();
    Totals {
        line_total: line_sum,
        grand_total: line_sum + manual_amount.max(Decimal::ZERO),
    }
}

// TTC = HT acrescido do imposto. Arredondamos a centavos só aqui,
// porque a multiplicação pela alíquota é a única fonte de casas extras.
pub fn total_ttc(total_ht: Decimal, tax_rate: Decimal) -> Decimal {
    (total_ht * (Decimal::ONE + tax_rate)).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    struct FakeLine {
        id: Uuid,
        quantity: i32,
        unit_price: Decimal,
    }

    impl LedgerLine for FakeLine {
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

    fn line(quantity: i32, unit_price: &str) -> FakeLine {
        FakeLine {
            id: Uuid::new_v4(),
            quantity,
            unit_price: d(unit_price),
        }
    }

    fn item(is_active: bool) -> CatalogItem {
        CatalogItem {
            id: Uuid::new_v4(),
            name: "Cuve inox 500L".to_string(),
            unit_price: d("1250.00"),
            is_active,
        }
    }

    #[test]
    fn totais_somam_todas_as_linhas() {
        let lines = vec![line(2, "50.00"), line(1, "100.00")];
        let totals = compute_totals(&lines, Decimal::ZERO);
        assert_eq!(totals.line_total, d("200.00"));
        assert_eq!(totals.grand_total, d("200.00"));
    }

    #[test]
    fn overlay_manual_entra_no_total_geral() {
        let lines = vec![line(3, "10.00")];
        let totals = compute_totals(&lines, d("250.00"));
        assert_eq!(totals.line_total, d("30.00"));
        assert_eq!(totals.grand_total, d("280.00"));
    }

    #[test]
    fn overlay_negativo_conta_como_zero() {
        let lines = vec![line(1, "99.90")];
        let totals = compute_totals(&lines, d("-40.00"));
        assert_eq!(totals.grand_total, d("99.90"));
    }

    #[test]
    fn sem_linhas_o_total_e_so_o_overlay() {
        let lines: Vec<FakeLine> = vec![];
        let totals = compute_totals(&lines, d("120.00"));
        assert_eq!(totals.line_total, Decimal::ZERO);
        assert_eq!(totals.grand_total, d("120.00"));
    }

    #[test]
    fn recomputo_e_idempotente() {
        let lines = vec![line(2, "33.33"), line(5, "1.10")];
        let a = compute_totals(&lines, d("7.00"));
        let b = compute_totals(&lines, d("7.00"));
        assert_eq!(a, b);
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(-100)]
    fn quantidade_abaixo_de_um_e_rejeitada(#[case] quantity: i32) {
        assert!(matches!(
            check_quantity(quantity),
            Err(AppError::InvalidQuantity)
        ));
    }

    #[test]
    fn quantidade_valida_passa() {
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(42).is_ok());
    }

    #[test]
    fn linha_congela_nome_e_preco_do_catalogo() {
        let catalog_item = item(true);
        let draft = build_line(&catalog_item, ItemType::Product, 2).unwrap();
        assert_eq!(draft.item_id, catalog_item.id);
        assert_eq!(draft.product_name, "Cuve inox 500L");
        assert_eq!(draft.unit_price, d("1250.00"));
        assert_eq!(draft.quantity, 2);
    }

    #[test]
    fn item_inativo_nao_vira_linha() {
        let catalog_item = item(false);
        let err = build_line(&catalog_item, ItemType::Kit, 1).unwrap_err();
        assert!(matches!(err, AppError::ItemInactive));
    }

    #[test]
    fn quantidade_invalida_barra_a_linha_antes_de_montar() {
        let catalog_item = item(true);
        let err = build_line(&catalog_item, ItemType::Product, 0).unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity));
    }

    #[test]
    fn ttc_aplica_aliquota_sobre_o_ht() {
        assert_eq!(total_ttc(d("200.00"), d("0.20")), d("240.00"));
        assert_eq!(total_ttc(d("99.99"), d("0.20")), d("119.99"));
        assert_eq!(total_ttc(d("0.00"), d("0.20")), d("0.00"));
    }
}
