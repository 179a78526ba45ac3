// src/services/dashboard_service.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PipelineRepository,
    models::dashboard::{PipelineStageSummary, PipelineSummary},
    models::ledger,
    models::pipeline::{
        weighted_amount, OpportunityLine, OpportunityStatus, OpportunityWithNames,
    },
};

#[derive(Clone)]
pub struct DashboardService {
    pipeline: PipelineRepository,
}

impl DashboardService {
    pub fn new(pipeline: PipelineRepository) -> Self {
        Self { pipeline }
    }

    pub async fn pipeline_summary<'e, E>(&self, executor: E) -> Result<PipelineSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let headers = self.pipeline.list(&mut *tx, None, None).await?;
        let ids: Vec<Uuid> = headers.iter().map(|h| h.opportunity.id).collect();
        let lines = self.pipeline.list_lines_for(&mut *tx, &ids).await?;

        tx.commit().await?;

        Ok(summarize(&headers, lines))
    }
}

// Agregação em memória, valor a valor pelo razão: a fórmula dos totais
// nunca é re-expressa em SQL.
fn summarize(headers: &[OpportunityWithNames], lines: Vec<OpportunityLine>) -> PipelineSummary {
    let mut lines_by_opp: HashMap<Uuid, Vec<OpportunityLine>> = HashMap::new();
    for line in lines {
        lines_by_opp.entry(line.opportunity_id).or_default().push(line);
    }

    let mut stages = Vec::with_capacity(OpportunityStatus::ALL.len());
    let mut open_count = 0;
    let mut open_amount = Decimal::ZERO;
    let mut open_weighted = Decimal::ZERO;

    for status in OpportunityStatus::ALL {
        let mut count = 0;
        let mut amount = Decimal::ZERO;
        let mut weighted = Decimal::ZERO;

        for header in headers.iter().filter(|h| h.opportunity.status == status) {
            let opp_lines = lines_by_opp
                .get(&header.opportunity.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let totals = ledger::compute_totals(opp_lines, header.opportunity.manual_amount);
            count += 1;
            amount += totals.grand_total;
            weighted += weighted_amount(totals.grand_total, header.opportunity.probability);
        }

        if !status.is_terminal() {
            open_count += count;
            open_amount += amount;
            open_weighted += weighted;
        }

        stages.push(PipelineStageSummary {
            status,
            count,
            amount,
            weighted_amount: weighted,
        });
    }

    PipelineSummary {
        stages,
        open_count,
        open_amount,
        open_weighted_amount: open_weighted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::ledger::ItemType;
    use crate::models::pipeline::{Opportunity, OpportunitySource};

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn header(
        status: OpportunityStatus,
        probability: i32,
        manual_amount: &str,
    ) -> OpportunityWithNames {
        OpportunityWithNames {
            opportunity: Opportunity {
                id: Uuid::new_v4(),
                title: "Oportunidade".to_string(),
                client_id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
                contact_name: None,
                contact_email: None,
                contact_phone: None,
                source: OpportunitySource::Salon,
                status,
                probability,
                expected_close_date: None,
                notes: None,
                lost_reason: None,
                lost_comment: None,
                manual_amount: d(manual_amount),
                order_id: None,
                deleted_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            client_name: "Jean Martin".to_string(),
            owner_name: "Marie Dupont".to_string(),
        }
    }

    fn line(opportunity_id: Uuid, quantity: i32, unit_price: &str) -> OpportunityLine {
        OpportunityLine {
            id: Uuid::new_v4(),
            opportunity_id,
            item_type: ItemType::Product,
            item_id: Uuid::new_v4(),
            product_name: "Cuve".to_string(),
            quantity,
            unit_price: d(unit_price),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn resumo_agrupa_por_status_e_soma_pelo_razao() {
        let proposition = header(OpportunityStatus::Proposition, 50, "0.00");
        let gagne = header(OpportunityStatus::Gagne, 100, "100.00");
        let lines = vec![
            line(proposition.opportunity.id, 2, "50.00"),
            line(proposition.opportunity.id, 1, "100.00"),
            line(gagne.opportunity.id, 1, "300.00"),
        ];

        let summary = summarize(&[proposition, gagne], lines);
        assert_eq!(summary.stages.len(), 6);

        let prop = summary
            .stages
            .iter()
            .find(|s| s.status == OpportunityStatus::Proposition)
            .unwrap();
        assert_eq!(prop.count, 1);
        assert_eq!(prop.amount, d("200.00"));
        assert_eq!(prop.weighted_amount, d("100.00"));

        let won = summary
            .stages
            .iter()
            .find(|s| s.status == OpportunityStatus::Gagne)
            .unwrap();
        assert_eq!(won.amount, d("400.00"));
        assert_eq!(won.weighted_amount, d("400.00"));
    }

    #[test]
    fn agregados_abertos_ignoram_terminais() {
        let open = header(OpportunityStatus::Qualification, 25, "0.00");
        let lost = header(OpportunityStatus::Perdu, 0, "0.00");
        let lines = vec![
            line(open.opportunity.id, 1, "1000.00"),
            line(lost.opportunity.id, 1, "9999.00"),
        ];

        let summary = summarize(&[open, lost], lines);
        assert_eq!(summary.open_count, 1);
        assert_eq!(summary.open_amount, d("1000.00"));
        assert_eq!(summary.open_weighted_amount, d("250.00"));
    }

    #[test]
    fn status_sem_oportunidade_aparece_zerado() {
        let summary = summarize(&[], vec![]);
        assert_eq!(summary.stages.len(), 6);
        assert!(summary.stages.iter().all(|s| s.count == 0));
        assert_eq!(summary.open_count, 0);
        assert_eq!(summary.open_amount, Decimal::ZERO);
    }
}
