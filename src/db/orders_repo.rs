// src/db/orders_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::ledger::LineDraft,
    models::orders::{Order, OrderLine, OrderStatus, OrderWithNames},
};

#[derive(Clone, Default)]
pub struct OrdersRepository;

impl OrdersRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  PEDIDOS
    // =========================================================================

    // Próximo número da sequência de referências. Consumido dentro da mesma
    // transação que insere o pedido, então um rollback pula o número sem colidir.
    pub async fn next_reference_seq<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let seq = sqlx::query_scalar::<_, i64>("SELECT nextval('order_reference_seq')")
            .fetch_one(executor)
            .await?;
        Ok(seq)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        reference: &str,
        client_id: Uuid,
        owner_id: Uuid,
        opportunity_id: Option<Uuid>,
        tax_rate: Decimal,
        total_ht: Decimal,
        total_ttc: Decimal,
        manual_amount: Decimal,
        expected_delivery: Option<NaiveDate>,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                reference, client_id, owner_id, opportunity_id,
                tax_rate, total_ht, total_ttc, manual_amount, expected_delivery
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(reference)
        .bind(client_id)
        .bind(owner_id)
        .bind(opportunity_id)
        .bind(tax_rate)
        .bind(total_ht)
        .bind(total_ttc)
        .bind(manual_amount)
        .bind(expected_delivery)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn lock<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn find_with_names<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<OrderWithNames>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, OrderWithNames>(
            r#"
            SELECT o.*, c.name AS client_name, u.name AS owner_name
            FROM orders o
            JOIN clients c ON c.id = o.client_id
            JOIN users u ON u.id = o.owner_id
            WHERE o.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderWithNames>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, OrderWithNames>(
            r#"
            SELECT o.*, c.name AS client_name, u.name AS owner_name
            FROM orders o
            JOIN clients c ON c.id = o.client_id
            JOIN users u ON u.id = o.owner_id
            WHERE ($1::order_status IS NULL OR o.status = $1)
            ORDER BY o.created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // Avança o status carimbando as datas da etapa na mesma escrita.
    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: OrderStatus,
        stamp_validated: bool,
        stamp_delivered: bool,
        tracking_number: Option<&str>,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                status          = $2,
                validated_at    = CASE WHEN $3 THEN NOW() ELSE validated_at END,
                delivered_at    = CASE WHEN $4 THEN NOW() ELSE delivered_at END,
                tracking_number = COALESCE($5, tracking_number),
                updated_at      = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(stamp_validated)
        .bind(stamp_delivered)
        .bind(tracking_number)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    // Os totais armazenados seguem o razão: recalculados e gravados
    // na mesma transação de qualquer mutação de linha ou overlay.
    pub async fn update_totals<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        total_ht: Decimal,
        total_ttc: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE orders SET total_ht = $2, total_ttc = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(total_ht)
        .bind(total_ttc)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn patch<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        expected_delivery: Option<NaiveDate>,
        tracking_number: Option<&str>,
        manual_amount: Option<Decimal>,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                expected_delivery = COALESCE($2, expected_delivery),
                tracking_number   = COALESCE($3, tracking_number),
                manual_amount     = COALESCE($4, manual_amount),
                updated_at        = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_delivery)
        .bind(tracking_number)
        .bind(manual_amount)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    // =========================================================================
    //  LINHAS
    // =========================================================================

    pub async fn insert_line<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        draft: &LineDraft,
    ) -> Result<OrderLine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, OrderLine>(
            r#"
            INSERT INTO order_lines (
                order_id, item_type, item_id, product_name, quantity, unit_price
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(draft.item_type)
        .bind(draft.item_id)
        .bind(&draft.product_name)
        .bind(draft.quantity)
        .bind(draft.unit_price)
        .fetch_one(executor)
        .await?;

        Ok(line)
    }

    pub async fn update_line_quantity<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        line_id: Uuid,
        quantity: i32,
    ) -> Result<Option<OrderLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, OrderLine>(
            "UPDATE order_lines SET quantity = $3
             WHERE id = $2 AND order_id = $1
             RETURNING *",
        )
        .bind(order_id)
        .bind(line_id)
        .bind(quantity)
        .fetch_optional(executor)
        .await?;
        Ok(line)
    }

    pub async fn delete_line<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        line_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM order_lines WHERE id = $2 AND order_id = $1")
            .bind(order_id)
            .bind(line_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_lines<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<Vec<OrderLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, OrderLine>(
            "SELECT * FROM order_lines
             WHERE order_id = $1
             ORDER BY created_at ASC",
        )
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }
}
