// src/services/order_service.rs

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, ClientsRepository, OrdersRepository, TimelineRepository},
    models::ledger::{self, AddLinePayload},
    models::orders::{
        check_order_transition, format_reference, CreateOrderPayload, Order, OrderDetail,
        OrderLine, OrderStatus, OrderTransitionPayload, OrderWithNames, UpdateOrderPayload,
    },
    models::timeline::TimelineKind,
    models::users::{ensure_can, Action, User},
};

#[derive(Clone)]
pub struct OrderService {
    repo: OrdersRepository,
    clients: ClientsRepository,
    catalog: CatalogRepository,
    timeline: TimelineRepository,
    default_tax_rate: Decimal,
}

impl OrderService {
    pub fn new(
        repo: OrdersRepository,
        clients: ClientsRepository,
        catalog: CatalogRepository,
        timeline: TimelineRepository,
        default_tax_rate: Decimal,
    ) -> Self {
        Self {
            repo,
            clients,
            catalog,
            timeline,
            default_tax_rate,
        }
    }

    // --- CRIAÇÃO MANUAL ---

    // Pedido criado direto, sem oportunidade de origem. Nasce BROUILLON
    // e sem linhas; os totais partem do overlay manual.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        actor: &User,
        payload: &CreateOrderPayload,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::CreateOrder)?;

        let mut tx = executor.begin().await?;

        self.clients
            .find_by_id(&mut *tx, payload.client_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Cliente".to_string()))?;

        let seq = self.repo.next_reference_seq(&mut *tx).await?;
        let reference = format_reference(Utc::now().year(), seq);

        let tax_rate = payload.tax_rate.unwrap_or(self.default_tax_rate);
        let manual_amount = payload
            .manual_amount
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);
        let totals = ledger::compute_totals::<OrderLine>(&[], manual_amount);
        let total_ttc = ledger::total_ttc(totals.grand_total, tax_rate);

        let order = self
            .repo
            .create(
                &mut *tx,
                &reference,
                payload.client_id,
                actor.id,
                None,
                tax_rate,
                totals.grand_total,
                total_ttc,
                manual_amount,
                payload.expected_delivery,
            )
            .await?;

        self.timeline
            .insert_event(
                &mut *tx,
                None,
                Some(order.id),
                TimelineKind::Created,
                actor.id,
                json!({ "reference": order.reference }),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Pedido {} criado por {}", order.reference, actor.name);
        Ok(order)
    }

    // --- LEITURA ---

    pub async fn get_detail<'e, E>(&self, executor: E, id: Uuid) -> Result<OrderDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let header = self
            .repo
            .find_with_names(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido".to_string()))?;
        let lines = self.repo.list_lines(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(OrderDetail::assemble(header, lines))
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderWithNames>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list(executor, status).await
    }

    // --- EDIÇÃO ---

    pub async fn patch<'e, E>(
        &self,
        executor: E,
        actor: &User,
        id: Uuid,
        payload: &UpdateOrderPayload,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::EditOrder)?;

        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido".to_string()))?;
        current.ensure_mutable()?;

        let manual_amount = payload.manual_amount.map(|m| m.max(Decimal::ZERO));

        let order = self
            .repo
            .patch(
                &mut *tx,
                id,
                payload.expected_delivery,
                payload.tracking_number.as_deref(),
                manual_amount,
            )
            .await?;

        // Overlay alterado: totais re-derivados das linhas na mesma transação.
        let order = if let Some(new_amount) = manual_amount {
            if new_amount != current.manual_amount {
                let refreshed = self.refresh_totals(&mut tx, &order).await?;
                self.timeline
                    .insert_event(
                        &mut *tx,
                        None,
                        Some(id),
                        TimelineKind::ManualAmountChanged,
                        actor.id,
                        json!({ "from": current.manual_amount, "to": new_amount }),
                    )
                    .await?;
                refreshed
            } else {
                order
            }
        } else {
            order
        };

        tx.commit().await?;
        Ok(order)
    }

    // --- TRANSIÇÃO ---

    pub async fn transition<'e, E>(
        &self,
        executor: E,
        actor: &User,
        id: Uuid,
        payload: &OrderTransitionPayload,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::TransitionOrder)?;

        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido".to_string()))?;

        check_order_transition(current.status, payload.status)?;

        let (stamp_validated, stamp_delivered) = transition_stamps(&current, payload.status);
        let order = self
            .repo
            .set_status(
                &mut *tx,
                id,
                payload.status,
                stamp_validated,
                stamp_delivered,
                payload.tracking_number.as_deref(),
            )
            .await?;

        self.timeline
            .insert_event(
                &mut *tx,
                None,
                Some(id),
                TimelineKind::StatusChange,
                actor.id,
                json!({ "from": current.status, "to": payload.status }),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Pedido {}: {:?} -> {:?} por {}",
            order.reference,
            current.status,
            payload.status,
            actor.name
        );
        Ok(order)
    }

    // --- LINHAS ---

    pub async fn add_line<'e, E>(
        &self,
        executor: E,
        actor: &User,
        order_id: Uuid,
        payload: &AddLinePayload,
    ) -> Result<OrderLine, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::EditOrder)?;

        let mut tx = executor.begin().await?;

        let order = self
            .repo
            .lock(&mut *tx, order_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido".to_string()))?;
        order.ensure_mutable()?;

        let item = self
            .catalog
            .find_item(&mut *tx, payload.item_type, payload.item_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Item de catálogo".to_string()))?;

        let draft = ledger::build_line(&item, payload.item_type, payload.quantity)?;
        let line = self.repo.insert_line(&mut *tx, order_id, &draft).await?;
        self.refresh_totals(&mut tx, &order).await?;

        self.timeline
            .insert_event(
                &mut *tx,
                None,
                Some(order_id),
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
        order_id: Uuid,
        line_id: Uuid,
        quantity: i32,
    ) -> Result<OrderLine, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::EditOrder)?;
        ledger::check_quantity(quantity)?;

        let mut tx = executor.begin().await?;

        let order = self
            .repo
            .lock(&mut *tx, order_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido".to_string()))?;
        order.ensure_mutable()?;

        let line = self
            .repo
            .update_line_quantity(&mut *tx, order_id, line_id, quantity)
            .await?
            .ok_or(AppError::LineNotFound)?;
        self.refresh_totals(&mut tx, &order).await?;

        self.timeline
            .insert_event(
                &mut *tx,
                None,
                Some(order_id),
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
        order_id: Uuid,
        line_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::EditOrder)?;

        let mut tx = executor.begin().await?;

        let order = self
            .repo
            .lock(&mut *tx, order_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido".to_string()))?;
        order.ensure_mutable()?;

        let removed = self.repo.delete_line(&mut *tx, order_id, line_id).await?;
        if !removed {
            return Err(AppError::LineNotFound);
        }
        self.refresh_totals(&mut tx, &order).await?;

        self.timeline
            .insert_event(
                &mut *tx,
                None,
                Some(order_id),
                TimelineKind::LineRemoved,
                actor.id,
                json!({ "lineId": line_id }),
            )
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // Relê as linhas e grava HT/TTC derivados, sempre dentro da transação
    // que acabou de mexer nelas.
    async fn refresh_totals(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<Order, AppError> {
        let lines = self.repo.list_lines(&mut **tx, order.id).await?;
        let current = self
            .repo
            .find(&mut **tx, order.id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido".to_string()))?;
        let totals = ledger::compute_totals(&lines, current.manual_amount);
        let total_ttc = ledger::total_ttc(totals.grand_total, current.tax_rate);
        self.repo
            .update_totals(&mut **tx, order.id, totals.grand_total, total_ttc)
            .await?;
        self.repo
            .find(&mut **tx, order.id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido".to_string()))
    }
}

// Carimbos de data aplicados junto com a mudança de status:
// validated_at na primeira validação, delivered_at na entrega.
fn transition_stamps(current: &Order, next: OrderStatus) -> (bool, bool) {
    let stamp_validated = next == OrderStatus::Validee && current.validated_at.is_none();
    let stamp_delivered = next == OrderStatus::Livree && current.delivered_at.is_none();
    (stamp_validated, stamp_delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn order(status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            reference: "CMD-2026-00001".to_string(),
            client_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            opportunity_id: None,
            status,
            tax_rate: d("0.20"),
            total_ht: d("200.00"),
            total_ttc: d("240.00"),
            manual_amount: Decimal::ZERO,
            expected_delivery: None,
            delivered_at: None,
            tracking_number: None,
            validated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn validacao_carimba_somente_na_primeira_vez() {
        let fresh = order(OrderStatus::Brouillon);
        assert_eq!(transition_stamps(&fresh, OrderStatus::Validee), (true, false));

        let mut revalidated = order(OrderStatus::Brouillon);
        revalidated.validated_at = Some(Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap());
        assert_eq!(
            transition_stamps(&revalidated, OrderStatus::Validee),
            (false, false)
        );
    }

    #[test]
    fn entrega_carimba_delivered_at() {
        let shipped = order(OrderStatus::Expediee);
        assert_eq!(transition_stamps(&shipped, OrderStatus::Livree), (false, true));
    }

    #[test]
    fn cancelamento_nao_carimba_nada() {
        let draft = order(OrderStatus::Brouillon);
        assert_eq!(transition_stamps(&draft, OrderStatus::Annulee), (false, false));
    }
}
