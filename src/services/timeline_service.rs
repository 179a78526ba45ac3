// src/services/timeline_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PipelineRepository, TimelineRepository},
    models::timeline::{
        filter_entries, merge_timeline, Note, TimelineEntry, TimelineFilter,
    },
    models::users::{ensure_can, Action, User},
};

#[derive(Clone)]
pub struct TimelineService {
    pipeline: PipelineRepository,
    timeline: TimelineRepository,
}

impl TimelineService {
    pub fn new(pipeline: PipelineRepository, timeline: TimelineRepository) -> Self {
        Self { pipeline, timeline }
    }

    // Feed unificado: eventos estruturados + notas, fundidos e ordenados
    // do mais recente para o mais antigo, com o filtro aplicado por cima.
    pub async fn get_timeline<'e, E>(
        &self,
        executor: E,
        opportunity_id: Uuid,
        raw_filter: Option<&str>,
    ) -> Result<Vec<TimelineEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let filter = TimelineFilter::parse(raw_filter)?;

        let mut tx = executor.begin().await?;

        self.pipeline
            .find(&mut *tx, opportunity_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;

        let events = self.timeline.list_events(&mut *tx, opportunity_id).await?;
        let notes = self.timeline.list_notes(&mut *tx, opportunity_id).await?;

        tx.commit().await?;

        let merged = merge_timeline(
            events.into_iter().map(TimelineEntry::from).collect(),
            notes.into_iter().map(TimelineEntry::from).collect(),
        );
        Ok(filter_entries(&merged, &filter))
    }

    // Notas não transicionam status e ignoram as travas do funil:
    // uma oportunidade ganha ou perdida continua recebendo notas.
    pub async fn add_note<'e, E>(
        &self,
        executor: E,
        actor: &User,
        opportunity_id: Uuid,
        content: &str,
    ) -> Result<TimelineEntry, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_can(actor.role, Action::AddNote)?;

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::EmptyContent);
        }

        let mut tx = executor.begin().await?;

        self.pipeline
            .find(&mut *tx, opportunity_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Oportunidade".to_string()))?;

        let (id, created_at) = self
            .timeline
            .insert_note(&mut *tx, opportunity_id, actor.id, content)
            .await?;

        tx.commit().await?;

        Ok(TimelineEntry::from(Note {
            id,
            opportunity_id,
            author_id: actor.id,
            author_name: actor.name.clone(),
            content: content.to_string(),
            created_at,
        }))
    }
}
