// src/services/pipeline_service.rs

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{Acquire, Executor, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, ClientsRepository, PipelineRepository, TimelineRepository, UsersRepository},
    models::ledger::{self, AddLinePayload},
    models::pipeline::{
        check_transition, CreateOpportunityPayload, LostInfo, LostReason, Opportunity,
        OpportunityDetail, OpportunityLine, OpportunityStatus, OpportunitySummary,
        ReassignPayload, TransitionPayload, UpdateOpportunityPayload,
    },
    models::timeline::TimelineKind,
    models::users::{ensure_can, Action, User},
};

#[derive(Clone)]
pub struct PipelineService {
    repo: PipelineRepository,
    clients: ClientsRepository,
    users: UsersRepository,
    catalog: CatalogRepository,
    timeline: TimelineRepository,
}

impl PipelineService {
    pub fn new(
        repo: PipelineRepository,
        clients: ClientsRepository,
        users: UsersRepository,
        catalog: CatalogRepository,
        timeline: TimelineRepository,
    ) -> Self {
        Self {
            repo,
            clients,
            users,
            catalog,
            timeline,
        }
    }

    // --- CRIAÇÃO ---

    pub async fn create<'e, E>(
        &self,
        executor: E,
        actor: &User,
        payload: &CreateOpportunityPayload,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::CreateOpportunity)?;

        let mut tx = executor.begin().await?;

        self.clients
            .find_by_id(&mut *tx, payload.client_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Cliente".to_string()))?;

        let status = OpportunityStatus::Nouveau;
        let manual_amount = payload
            .manual_amount
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);

        // Quem cria é o dono; trocar de dono é uma operação própria, com gate.
        let opportunity = self
            .repo
            .create(
                &mut *tx,
                payload.client_id,
                actor.id,
                &payload.title,
                payload.contact_name.as_deref(),
                payload.contact_email.as_deref(),
                payload.contact_phone.as_deref(),
                payload.source,
                status,
                status.default_probability(),
                payload.expected_close_date,
                payload.notes.as_deref(),
                manual_amount,
            )
            .await?;

        self.timeline
            .insert_event(
                &mut *tx,
                Some(opportunity.id),
                None,
                TimelineKind::Created,
                actor.id,
                json!({ "title": opportunity.title }),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Oportunidade {} criada por {}", opportunity.id, actor.name);
        Ok(opportunity)
    }

    // --- LEITURA ---

    pub async fn get_detail<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<OpportunityDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let header = self
            .repo
            .find_with_names(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;
        let lines = self.repo.list_lines(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(OpportunityDetail::assemble(header, lines))
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        owner_id: Option<Uuid>,
        status: Option<OpportunityStatus>,
    ) -> Result<Vec<OpportunitySummary>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let headers = self.repo.list(&mut *tx, owner_id, status).await?;
        let ids: Vec<Uuid> = headers.iter().map(|h| h.opportunity.id).collect();
        let all_lines = self.repo.list_lines_for(&mut *tx, &ids).await?;

        tx.commit().await?;

        let mut lines_by_opp: HashMap<Uuid, Vec<OpportunityLine>> = HashMap::new();
        for line in all_lines {
            lines_by_opp.entry(line.opportunity_id).or_default().push(line);
        }

        let summaries = headers
            .iter()
            .map(|header| {
                let lines = lines_by_opp
                    .get(&header.opportunity.id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                OpportunitySummary::from_header(header, lines)
            })
            .collect();
        Ok(summaries)
    }

    // --- EDIÇÃO ---

    pub async fn update<'e, E>(
        &self,
        executor: E,
        actor: &User,
        id: Uuid,
        payload: &UpdateOpportunityPayload,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::EditOpportunity)?;

        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;
        current.ensure_editable()?;

        let manual_amount = payload.manual_amount.map(|m| m.max(Decimal::ZERO));

        let opportunity = self
            .repo
            .update_fields(
                &mut *tx,
                id,
                payload.title.as_deref(),
                payload.contact_name.as_deref(),
                payload.contact_email.as_deref(),
                payload.contact_phone.as_deref(),
                payload.source,
                payload.probability,
                payload.expected_close_date,
                payload.notes.as_deref(),
                manual_amount,
            )
            .await?;

        // O overlay manual mexe no valor previsto; fica registrado no histórico.
        if let Some(new_amount) = manual_amount {
            if new_amount != current.manual_amount {
                self.timeline
                    .insert_event(
                        &mut *tx,
                        Some(id),
                        None,
                        TimelineKind::ManualAmountChanged,
                        actor.id,
                        json!({ "from": current.manual_amount, "to": new_amount }),
                    )
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(opportunity)
    }

    pub async fn soft_delete<'e, E>(
        &self,
        executor: E,
        actor: &User,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::DeleteOpportunity)?;

        let mut tx = executor.begin().await?;

        self.repo
            .lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;
        self.repo.soft_delete(&mut *tx, id).await?;

        tx.commit().await?;

        tracing::info!("Oportunidade {} arquivada por {}", id, actor.name);
        Ok(())
    }

    // --- TRANSIÇÃO DE STATUS ---

    pub async fn transition<'e, E>(
        &self,
        executor: E,
        actor: &User,
        id: Uuid,
        payload: &TransitionPayload,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::TransitionOpportunity)?;

        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;

        let lost_info = payload.lost_info();
        check_transition(current.status, payload.status, lost_info.as_ref())?;

        let probability = payload
            .probability
            .unwrap_or_else(|| payload.status.default_probability());
        let (lost_reason, lost_comment) = lost_fields(payload.status, lost_info.as_ref());

        let opportunity = self
            .repo
            .set_status(
                &mut *tx,
                id,
                payload.status,
                probability,
                lost_reason,
                lost_comment.as_deref(),
            )
            .await?;

        let mut event = json!({ "from": current.status, "to": payload.status });
        if let Some(info) = &lost_info {
            if payload.status == OpportunityStatus::Perdu {
                event["lostReason"] = json!(info.reason);
                if let Some(competitor) = &info.competitor_name {
                    event["competitorName"] = json!(competitor);
                }
            }
        }
        self.timeline
            .insert_event(
                &mut *tx,
                Some(id),
                None,
                TimelineKind::StatusChange,
                actor.id,
                event,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Oportunidade {}: {:?} -> {:?} por {}",
            id,
            current.status,
            payload.status,
            actor.name
        );
        Ok(opportunity)
    }

    // --- REATRIBUIÇÃO ---

    pub async fn reassign<'e, E>(
        &self,
        executor: E,
        actor: &User,
        id: Uuid,
        payload: &ReassignPayload,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::ReassignOpportunity)?;

        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;

        // Reatribuir para o mesmo dono é um no-op silencioso.
        if current.owner_id == payload.new_owner_id {
            tx.commit().await?;
            return Ok(current);
        }

        let new_owner = self
            .users
            .find_active_on(&mut *tx, payload.new_owner_id)
            .await?
            .filter(|u| u.role.can_own_opportunities())
            .ok_or(AppError::UserNotFound)?;

        let opportunity = self.repo.set_owner(&mut *tx, id, new_owner.id).await?;

        self.timeline
            .insert_event(
                &mut *tx,
                Some(id),
                None,
                TimelineKind::OwnerChange,
                actor.id,
                json!({
                    "from": current.owner_id,
                    "to": new_owner.id,
                    "newOwnerName": new_owner.name,
                }),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Oportunidade {} reatribuída para {} por {}",
            id,
            new_owner.name,
            actor.name
        );
        Ok(opportunity)
    }

    // --- LINHAS ---

    pub async fn add_line<'e, E>(
        &self,
        executor: E,
        actor: &User,
        opportunity_id: Uuid,
        payload: &AddLinePayload,
    ) -> Result<OpportunityLine, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::EditOpportunity)?;

        let mut tx = executor.begin().await?;

        let opportunity = self
            .repo
            .lock(&mut *tx, opportunity_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;
        opportunity.ensure_editable()?;

        let item = self
            .catalog
            .find_item(&mut *tx, payload.item_type, payload.item_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Item de catálogo".to_string()))?;

        let draft = ledger::build_line(&item, payload.item_type, payload.quantity)?;
        let line = self.repo.insert_line(&mut *tx, opportunity_id, &draft).await?;

        self.timeline
            .insert_event(
                &mut *tx,
                Some(opportunity_id),
                None,
                TimelineKind::LineAdded,
                actor.id,
                json!({
                    "lineId": line.id,
                    "itemType": line.item_type,
                    "productName": line.product_name,
                    "quantity": line.quantity,
                    "unitPrice": line.unit_price,
                }),
            )
            .await?;

        tx.commit().await?;
        Ok(line)
    }

    pub async fn update_line_quantity<'e, E>(
        &self,
        executor: E,
        actor: &User,
        opportunity_id: Uuid,
        line_id: Uuid,
        quantity: i32,
    ) -> Result<OpportunityLine, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::EditOpportunity)?;
        ledger::check_quantity(quantity)?;

        let mut tx = executor.begin().await?;

        let opportunity = self
            .repo
            .lock(&mut *tx, opportunity_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;
        opportunity.ensure_editable()?;

        let line = self
            .repo
            .update_line_quantity(&mut *tx, opportunity_id, line_id, quantity)
            .await?
            .ok_or(AppError::LineNotFound)?;

        self.timeline
            .insert_event(
                &mut *tx,
                Some(opportunity_id),
                None,
                TimelineKind::LineUpdated,
                actor.id,
                json!({ "lineId": line.id, "quantity": line.quantity }),
            )
            .await?;

        tx.commit().await?;
        Ok(line)
    }

    pub async fn remove_line<'e, E>(
        &self,
        executor: E,
        actor: &User,
        opportunity_id: Uuid,
        line_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::EditOpportunity)?;

        let mut tx = executor.begin().await?;

        let opportunity = self
            .repo
            .lock(&mut *tx, opportunity_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;
        opportunity.ensure_editable()?;

        let removed = self.repo.delete_line(&mut *tx, opportunity_id, line_id).await?;
        if !removed {
            return Err(AppError::LineNotFound);
        }

        self.timeline
            .insert_event(
                &mut *tx,
                Some(opportunity_id),
                None,
                TimelineKind::LineRemoved,
                actor.id,
                json!({ "lineId": line_id }),
            )
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

// Campos de perda gravados junto com o novo status: preenchidos ao perder,
// limpos em qualquer outro destino (inclusive reabertura).
fn lost_fields(
    next: OpportunityStatus,
    lost: Option<&LostInfo>,
) -> (Option<LostReason>, Option<String>) {
    if next != OpportunityStatus::Perdu {
        return (None, None);
    }
    match lost {
        Some(info) => {
            let comment = info
                .comment
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from);
            (Some(info.reason), comment)
        }
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(reason: LostReason, comment: Option<&str>) -> LostInfo {
        LostInfo {
            reason,
            comment: comment.map(String::from),
            competitor_name: None,
        }
    }

    #[test]
    fn perda_grava_motivo_e_comentario_aparado() {
        let lost = info(LostReason::PrixTropEleve, Some("  muito acima do teto  "));
        let (reason, comment) = lost_fields(OpportunityStatus::Perdu, Some(&lost));
        assert_eq!(reason, Some(LostReason::PrixTropEleve));
        assert_eq!(comment.as_deref(), Some("muito acima do teto"));
    }

    #[test]
    fn comentario_em_branco_vira_nulo() {
        let lost = info(LostReason::Concurrent, Some("   "));
        let (reason, comment) = lost_fields(OpportunityStatus::Perdu, Some(&lost));
        assert_eq!(reason, Some(LostReason::Concurrent));
        assert_eq!(comment, None);
    }

    #[test]
    fn destino_nao_perdido_limpa_os_campos() {
        let lost = info(LostReason::Autre, Some("qualquer"));
        assert_eq!(
            lost_fields(OpportunityStatus::Qualification, Some(&lost)),
            (None, None)
        );
        assert_eq!(lost_fields(OpportunityStatus::Gagne, None), (None, None));
    }
}
