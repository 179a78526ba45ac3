// src/db/pipeline_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::ledger::LineDraft,
    models::pipeline::{
        LostReason, Opportunity, OpportunityLine, OpportunitySource, OpportunityStatus,
        OpportunityWithNames,
    },
};

#[derive(Clone, Default)]
pub struct PipelineRepository;

impl PipelineRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  OPORTUNIDADES
    // =========================================================================

    pub async fn create<'e, E>(
        &self,
        executor: E,
        client_id: Uuid,
        owner_id: Uuid,
        title: &str,
        contact_name: Option<&str>,
        contact_email: Option<&str>,
        contact_phone: Option<&str>,
        source: OpportunitySource,
        status: OpportunityStatus,
        probability: i32,
        expected_close_date: Option<NaiveDate>,
        notes: Option<&str>,
        manual_amount: Decimal,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let opportunity = sqlx::query_as::<_, Opportunity>(
            r#"
            INSERT INTO opportunities (
                client_id, owner_id, title,
                contact_name, contact_email, contact_phone,
                source, status, probability,
                expected_close_date, notes, manual_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(owner_id)
        .bind(title)
        .bind(contact_name)
        .bind(contact_email)
        .bind(contact_phone)
        .bind(source)
        .bind(status)
        .bind(probability)
        .bind(expected_close_date)
        .bind(notes)
        .bind(manual_amount)
        .fetch_one(executor)
        .await?;

        Ok(opportunity)
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Opportunity>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let opportunity = sqlx::query_as::<_, Opportunity>(
            "SELECT * FROM opportunities WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(opportunity)
    }

    // Tranca a linha da oportunidade até o fim da transação. Toda escrita
    // passa por aqui primeiro: duas mutações simultâneas nunca se entrelaçam.
    pub async fn lock<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Opportunity>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let opportunity = sqlx::query_as::<_, Opportunity>(
            "SELECT * FROM opportunities WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(opportunity)
    }

    pub async fn find_with_names<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<OpportunityWithNames>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, OpportunityWithNames>(
            r#"
            SELECT o.*, c.name AS client_name, u.name AS owner_name
            FROM opportunities o
            JOIN clients c ON c.id = o.client_id
            JOIN users u ON u.id = o.owner_id
            WHERE o.id = $1 AND o.deleted_at IS NULL
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
        owner_id: Option<Uuid>,
        status: Option<OpportunityStatus>,
    ) -> Result<Vec<OpportunityWithNames>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, OpportunityWithNames>(
            r#"
            SELECT o.*, c.name AS client_name, u.name AS owner_name
            FROM opportunities o
            JOIN clients c ON c.id = o.client_id
            JOIN users u ON u.id = o.owner_id
            WHERE o.deleted_at IS NULL
              AND ($1::uuid IS NULL OR o.owner_id = $1)
              AND ($2::opportunity_status IS NULL OR o.status = $2)
            ORDER BY o.updated_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(status)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // Patch parcial: campos ausentes ficam como estão.
    pub async fn update_fields<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        title: Option<&str>,
        contact_name: Option<&str>,
        contact_email: Option<&str>,
        contact_phone: Option<&str>,
        source: Option<OpportunitySource>,
        probability: Option<i32>,
        expected_close_date: Option<NaiveDate>,
        notes: Option<&str>,
        manual_amount: Option<Decimal>,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let opportunity = sqlx::query_as::<_, Opportunity>(
            r#"
            UPDATE opportunities SET
                title               = COALESCE($2, title),
                contact_name        = COALESCE($3, contact_name),
                contact_email       = COALESCE($4, contact_email),
                contact_phone       = COALESCE($5, contact_phone),
                source              = COALESCE($6, source),
                probability         = COALESCE($7, probability),
                expected_close_date = COALESCE($8, expected_close_date),
                notes               = COALESCE($9, notes),
                manual_amount       = COALESCE($10, manual_amount),
                updated_at          = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(contact_name)
        .bind(contact_email)
        .bind(contact_phone)
        .bind(source)
        .bind(probability)
        .bind(expected_close_date)
        .bind(notes)
        .bind(manual_amount)
        .fetch_one(executor)
        .await?;

        Ok(opportunity)
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: OpportunityStatus,
        probability: i32,
        lost_reason: Option<LostReason>,
        lost_comment: Option<&str>,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let opportunity = sqlx::query_as::<_, Opportunity>(
            r#"
            UPDATE opportunities SET
                status       = $2,
                probability  = $3,
                lost_reason  = $4,
                lost_comment = $5,
                updated_at   = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(probability)
        .bind(lost_reason)
        .bind(lost_comment)
        .fetch_one(executor)
        .await?;

        Ok(opportunity)
    }

    pub async fn set_owner<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let opportunity = sqlx::query_as::<_, Opportunity>(
            "UPDATE opportunities SET owner_id = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_one(executor)
        .await?;
        Ok(opportunity)
    }

    // Referência reversa da conversão: gravada uma única vez.
    pub async fn set_order_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        order_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE opportunities SET order_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(order_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE opportunities SET deleted_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  LINHAS
    // =========================================================================

    pub async fn insert_line<'e, E>(
        &self,
        executor: E,
        opportunity_id: Uuid,
        draft: &LineDraft,
    ) -> Result<OpportunityLine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, OpportunityLine>(
            r#"
            INSERT INTO opportunity_lines (
                opportunity_id, item_type, item_id, product_name, quantity, unit_price
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(opportunity_id)
        .bind(draft.item_type)
        .bind(draft.item_id)
        .bind(&draft.product_name)
        .bind(draft.quantity)
        .bind(draft.unit_price)
        .fetch_one(executor)
        .await?;

        Ok(line)
    }

    // Só a quantidade muda em uma linha; preço exige remover e readicionar.
    pub async fn update_line_quantity<'e, E>(
        &self,
        executor: E,
        opportunity_id: Uuid,
        line_id: Uuid,
        quantity: i32,
    ) -> Result<Option<OpportunityLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, OpportunityLine>(
            "UPDATE opportunity_lines SET quantity = $3
             WHERE id = $2 AND opportunity_id = $1
             RETURNING *",
        )
        .bind(opportunity_id)
        .bind(line_id)
        .bind(quantity)
        .fetch_optional(executor)
        .await?;
        Ok(line)
    }

    pub async fn delete_line<'e, E>(
        &self,
        executor: E,
        opportunity_id: Uuid,
        line_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM opportunity_lines WHERE id = $2 AND opportunity_id = $1",
        )
        .bind(opportunity_id)
        .bind(line_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_lines<'e, E>(
        &self,
        executor: E,
        opportunity_id: Uuid,
    ) -> Result<Vec<OpportunityLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, OpportunityLine>(
            "SELECT * FROM opportunity_lines
             WHERE opportunity_id = $1
             ORDER BY created_at ASC",
        )
        .bind(opportunity_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    // Linhas de várias oportunidades em uma ida só, para as telas de lista.
    pub async fn list_lines_for<'e, E>(
        &self,
        executor: E,
        opportunity_ids: &[Uuid],
    ) -> Result<Vec<OpportunityLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, OpportunityLine>(
            "SELECT * FROM opportunity_lines
             WHERE opportunity_id = ANY($1)
             ORDER BY created_at ASC",
        )
        .bind(opportunity_ids)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }
}
