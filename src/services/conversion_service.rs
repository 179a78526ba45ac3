// src/services/conversion_service.rs

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{OrdersRepository, PipelineRepository, TimelineRepository},
    models::ledger::{self, LineDraft},
    models::orders::{format_reference, Order},
    models::pipeline::{Opportunity, OpportunityLine, OpportunityStatus},
    models::timeline::TimelineKind,
    models::users::{ensure_can, Action, User},
};

// Conversão de oportunidade ganha em pedido: uma transação, tudo ou nada.
#[derive(Clone)]
pub struct ConversionService {
    pipeline: PipelineRepository,
    orders: OrdersRepository,
    timeline: TimelineRepository,
    default_tax_rate: Decimal,
}

impl ConversionService {
    pub fn new(
        pipeline: PipelineRepository,
        orders: OrdersRepository,
        timeline: TimelineRepository,
        default_tax_rate: Decimal,
    ) -> Self {
        Self {
            pipeline,
            orders,
            timeline,
            default_tax_rate,
        }
    }

    pub async fn convert<'e, E>(
        &self,
        executor: E,
        actor: &User,
        opportunity_id: Uuid,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::ConvertOpportunity)?;

        let mut tx = executor.begin().await?;

        // O lock serializa conversões concorrentes; a trava one-shot é
        // re-conferida aqui dentro, depois do lock, para fechar a corrida.
        // O UNIQUE em orders.opportunity_id é o backstop de esquema.
        let opportunity = self
            .pipeline
            .lock(&mut *tx, opportunity_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;

        let lines = self.pipeline.list_lines(&mut *tx, opportunity_id).await?;
        check_convertible(&opportunity, lines.len())?;

        let seq = self.orders.next_reference_seq(&mut *tx).await?;
        let reference = format_reference(Utc::now().year(), seq);

        // O razão calcula os totais sobre as linhas copiadas, com a mesma
        // semântica das leituras da oportunidade.
        let totals = ledger::compute_totals(&lines, opportunity.manual_amount);
        let total_ttc = ledger::total_ttc(totals.grand_total, self.default_tax_rate);

        // O dono do pedido é o dono atual da oportunidade, não quem converte.
        let order = self
            .orders
            .create(
                &mut *tx,
                &reference,
                opportunity.client_id,
                opportunity.owner_id,
                Some(opportunity.id),
                self.default_tax_rate,
                totals.grand_total,
                total_ttc,
                opportunity.manual_amount,
                None,
            )
            .await?;

        // Cópia profunda: nome e preço congelados na linha, nunca referenciados
        // de volta ao catálogo. Mudança de preço futura não alcança o pedido.
        for draft in snapshot_lines(&lines) {
            self.orders.insert_line(&mut *tx, order.id, &draft).await?;
        }

        self.pipeline
            .set_order_id(&mut *tx, opportunity.id, order.id)
            .await?;

        self.timeline
            .insert_event(
                &mut *tx,
                None,
                Some(order.id),
                TimelineKind::Created,
                actor.id,
                json!({
                    "reference": order.reference,
                    "fromOpportunityId": opportunity.id,
                }),
            )
            .await?;
        // Entrada correlata no histórico da oportunidade de origem
        self.timeline
            .insert_event(
                &mut *tx,
                Some(opportunity.id),
                None,
                TimelineKind::Created,
                actor.id,
                json!({
                    "orderId": order.id,
                    "reference": order.reference,
                }),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Oportunidade {} convertida no pedido {} por {}",
            opportunity.id,
            order.reference,
            actor.name
        );
        Ok(order)
    }
}

// Pré-condições da conversão, cada uma com sua falha própria:
// só GAGNE converte, uma única vez, e nunca sem linhas.
fn check_convertible(opportunity: &Opportunity, line_count: usize) -> Result<(), AppError> {
    if opportunity.status != OpportunityStatus::Gagne {
        return Err(AppError::NotWon);
    }
    if opportunity.order_id.is_some() {
        return Err(AppError::AlreadyConverted);
    }
    if line_count == 0 {
        return Err(AppError::NoLines);
    }
    Ok(())
}

// As linhas do pedido nascem como cópia campo a campo das linhas da
// oportunidade; as duas coleções seguem vidas independentes depois disso.
fn snapshot_lines(lines: &[OpportunityLine]) -> Vec<LineDraft> {
    lines
        .iter()
        .map(|line| LineDraft {
            item_type: line.item_type,
            item_id: line.item_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ledger::ItemType;
    use crate::models::pipeline::OpportunitySource;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn opportunity(status: OpportunityStatus, order_id: Option<Uuid>) -> Opportunity {
        Opportunity {
            id: Uuid::new_v4(),
            title: "Renouvellement cuves".to_string(),
            client_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            contact_name: None,
            contact_email: None,
            contact_phone: None,
            source: OpportunitySource::Salon,
            status,
            probability: status.default_probability(),
            expected_close_date: None,
            notes: None,
            lost_reason: None,
            lost_comment: None,
            manual_amount: Decimal::ZERO,
            order_id,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn so_oportunidade_ganha_converte() {
        for status in [
            OpportunityStatus::Nouveau,
            OpportunityStatus::Qualification,
            OpportunityStatus::Proposition,
            OpportunityStatus::Negociation,
            OpportunityStatus::Perdu,
        ] {
            let opp = opportunity(status, None);
            assert!(matches!(
                check_convertible(&opp, 2),
                Err(AppError::NotWon)
            ));
        }
    }

    #[test]
    fn sem_linhas_nao_ha_conversao() {
        let opp = opportunity(OpportunityStatus::Gagne, None);
        assert!(matches!(check_convertible(&opp, 0), Err(AppError::NoLines)));
    }

    #[test]
    fn conversao_e_one_shot() {
        let mut opp = opportunity(OpportunityStatus::Gagne, None);
        assert!(check_convertible(&opp, 2).is_ok());

        // a referência reversa gravada pela primeira conversão barra a segunda
        opp.order_id = Some(Uuid::new_v4());
        assert!(matches!(
            check_convertible(&opp, 2),
            Err(AppError::AlreadyConverted)
        ));
    }

    #[test]
    fn ganha_com_linhas_e_sem_pedido_passa() {
        let opp = opportunity(OpportunityStatus::Gagne, None);
        assert!(check_convertible(&opp, 1).is_ok());
    }

    fn line(item_type: ItemType, name: &str, quantity: i32, unit_price: &str) -> OpportunityLine {
        OpportunityLine {
            id: Uuid::new_v4(),
            opportunity_id: Uuid::new_v4(),
            item_type,
            item_id: Uuid::new_v4(),
            product_name: name.to_string(),
            quantity,
            unit_price: d(unit_price),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_copia_todos_os_campos_da_linha() {
        let lines = vec![
            line(ItemType::Product, "Cuve inox 500L", 2, "50.00"),
            line(ItemType::Kit, "Kit embouteillage", 1, "100.00"),
        ];

        let drafts = snapshot_lines(&lines);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].item_type, ItemType::Product);
        assert_eq!(drafts[0].item_id, lines[0].item_id);
        assert_eq!(drafts[0].product_name, "Cuve inox 500L");
        assert_eq!(drafts[0].quantity, 2);
        assert_eq!(drafts[0].unit_price, d("50.00"));
        assert_eq!(drafts[1].item_type, ItemType::Kit);
        assert_eq!(drafts[1].unit_price, d("100.00"));
    }

    #[test]
    fn snapshot_preserva_a_ordem_das_linhas() {
        let lines = vec![
            line(ItemType::Product, "A", 1, "10.00"),
            line(ItemType::Product, "B", 1, "20.00"),
            line(ItemType::Product, "C", 1, "30.00"),
        ];
        let drafts = snapshot_lines(&lines);
        let names: Vec<&str> = drafts.iter().map(|d| d.product_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    // Cenário do fim a fim: duas linhas (2 × 50 + 1 × 100), overlay zero,
    // 20% de imposto. Os totais que a conversão grava saem daqui.
    #[test]
    fn totais_da_conversao_seguem_o_razao() {
        let lines = vec![
            line(ItemType::Product, "Produit A", 2, "50.00"),
            line(ItemType::Kit, "Kit B", 1, "100.00"),
        ];
        let totals = ledger::compute_totals(&lines, Decimal::ZERO);
        assert_eq!(totals.grand_total, d("200.00"));
        assert_eq!(ledger::total_ttc(totals.grand_total, d("0.20")), d("240.00"));
    }
}
