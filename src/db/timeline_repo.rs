// src/db/timeline_repo.rs

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::timeline::{Note, TimelineEvent, TimelineKind},
};

// Duas fontes independentes: eventos estruturados e notas de texto livre.
// A fusão em um feed único acontece no serviço, nunca no SQL.
#[derive(Clone, Default)]
pub struct TimelineRepository;

impl TimelineRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  EVENTOS
    // =========================================================================

    pub async fn insert_event<'e, E>(
        &self,
        executor: E,
        opportunity_id: Option<Uuid>,
        order_id: Option<Uuid>,
        kind: TimelineKind,
        user_id: Uuid,
        payload: Value,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO timeline_events (opportunity_id, order_id, kind, user_id, payload)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(opportunity_id)
        .bind(order_id)
        .bind(kind)
        .bind(user_id)
        .bind(payload)
        .execute(executor)
        .await?;
        Ok(())
    }

    // Base determinística para a fusão: ordem de inserção, nunca a ordem
    // física do heap. Os empates de timestamp ficam estáveis no feed.
    pub async fn list_events<'e, E>(
        &self,
        executor: E,
        opportunity_id: Uuid,
    ) -> Result<Vec<TimelineEvent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let events = sqlx::query_as::<_, TimelineEvent>(
            r#"
            SELECT e.id, e.opportunity_id, e.order_id, e.kind, e.user_id,
                   u.name AS user_name, e.payload, e.created_at
            FROM timeline_events e
            LEFT JOIN users u ON u.id = e.user_id
            WHERE e.opportunity_id = $1
            ORDER BY e.seq ASC
            "#,
        )
        .bind(opportunity_id)
        .fetch_all(executor)
        .await?;
        Ok(events)
    }

    // =========================================================================
    //  NOTAS
    // =========================================================================

    pub async fn insert_note<'e, E>(
        &self,
        executor: E,
        opportunity_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<(Uuid, DateTime<Utc>), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "INSERT INTO opportunity_notes (opportunity_id, author_id, content)
             VALUES ($1, $2, $3)
             RETURNING id, created_at",
        )
        .bind(opportunity_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn list_notes<'e, E>(
        &self,
        executor: E,
        opportunity_id: Uuid,
    ) -> Result<Vec<Note>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT n.id, n.opportunity_id, n.author_id,
                   u.name AS author_name, n.content, n.created_at
            FROM opportunity_notes n
            JOIN users u ON u.id = n.author_id
            WHERE n.opportunity_id = $1
            ORDER BY n.seq ASC
            "#,
        )
        .bind(opportunity_id)
        .fetch_all(executor)
        .await?;
        Ok(notes)
    }
}
