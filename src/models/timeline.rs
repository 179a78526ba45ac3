// src/models/timeline.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// --- Enums ---

// Discriminante de cada entrada do histórico. NOTE existe só na visão
// agregada: notas vivem em tabela própria, nunca em timeline_events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "timeline_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineKind {
    StatusChange,
    OwnerChange,
    LineAdded,
    LineRemoved,
    LineUpdated,
    ManualAmountChanged,
    Created,
    DocumentAttached,
    RdvScheduled,
    EmailSent,
    Note,
}

// --- Structs ---

// Evento estruturado como sai do banco, com o nome do autor resolvido.
#[derive(Debug, Clone, FromRow)]
pub struct TimelineEvent {
    pub id: Uuid,
    pub opportunity_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub kind: TimelineKind,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Note {
    pub id: Uuid,
    pub opportunity_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// Forma unificada que o feed devolve, seja evento ou nota.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: Uuid,
    pub kind: TimelineKind,
    pub user_id: Option<Uuid>,
    #[schema(example = "Marie Dupont")]
    pub user_name: Option<String>,
    // Texto livre, presente apenas em notas
    pub content: Option<String>,
    // Detalhe estruturado, presente apenas em eventos
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl From<TimelineEvent> for TimelineEntry {
    fn from(e: TimelineEvent) -> Self {
        TimelineEntry {
            id: e.id,
            kind: e.kind,
            user_id: e.user_id,
            user_name: e.user_name,
            content: None,
            payload: e.payload,
            created_at: e.created_at,
        }
    }
}

impl From<Note> for TimelineEntry {
    fn from(n: Note) -> Self {
        TimelineEntry {
            id: n.id,
            kind: TimelineKind::Note,
            user_id: Some(n.author_id),
            user_name: Some(n.author_name),
            content: Some(n.content),
            payload: Value::Object(Default::default()),
            created_at: n.created_at,
        }
    }
}

// --- Filtro ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineFilter {
    All,
    NotesOnly,
    Kind(TimelineKind),
}

impl TimelineFilter {
    // Aceita "all", "notes-only" ou um discriminante como "STATUS_CHANGE".
    pub fn parse(raw: Option<&str>) -> Result<TimelineFilter, AppError> {
        match raw {
            None | Some("all") => Ok(TimelineFilter::All),
            Some("notes-only") => Ok(TimelineFilter::NotesOnly),
            Some(other) => {
                serde_json::from_value::<TimelineKind>(Value::String(other.to_string()))
                    .map(TimelineFilter::Kind)
                    .map_err(|_| AppError::UnknownFilter(other.to_string()))
            }
        }
    }

    pub fn matches(&self, entry: &TimelineEntry) -> bool {
        match self {
            TimelineFilter::All => true,
            TimelineFilter::NotesOnly => entry.kind == TimelineKind::Note,
            TimelineFilter::Kind(kind) => entry.kind == *kind,
        }
    }
}

// --- Operações ---

// Funde as duas fontes e ordena do mais recente para o mais antigo.
// A ordenação é estável: empates de timestamp preservam a ordem de chegada.
// Nenhuma das fontes chega pré-ordenada.
pub fn merge_timeline(
    events: Vec<TimelineEntry>,
    notes: Vec<TimelineEntry>,
) -> Vec<TimelineEntry> {
    let mut merged = events;
    merged.extend(notes);
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}

// Filtro puro sobre o feed já montado: reaplicável sem nova consulta.
pub fn filter_entries(entries: &[TimelineEntry], filter: &TimelineFilter) -> Vec<TimelineEntry> {
    entries
        .iter()
        .filter(|e| filter.matches(e))
        .cloned()
        .collect()
}

// --- Payloads ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddNotePayload {
    #[schema(example = "Client rappelé, attend la nouvelle proposition")]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, minute, 0).unwrap()
    }

    fn event(kind: TimelineKind, created_at: DateTime<Utc>) -> TimelineEntry {
        TimelineEntry {
            id: Uuid::new_v4(),
            kind,
            user_id: Some(Uuid::new_v4()),
            user_name: Some("Marie Dupont".to_string()),
            content: None,
            payload: Value::Object(Default::default()),
            created_at,
        }
    }

    fn note(content: &str, created_at: DateTime<Utc>) -> TimelineEntry {
        TimelineEntry {
            id: Uuid::new_v4(),
            kind: TimelineKind::Note,
            user_id: Some(Uuid::new_v4()),
            user_name: Some("Marie Dupont".to_string()),
            content: Some(content.to_string()),
            payload: Value::Object(Default::default()),
            created_at,
        }
    }

    #[test]
    fn feed_sai_do_mais_recente_para_o_mais_antigo() {
        // fontes fora de ordem de propósito
        let events = vec![
            event(TimelineKind::StatusChange, at(9, 0)),
            event(TimelineKind::OwnerChange, at(11, 0)),
        ];
        let notes = vec![note("ligar amanhã", at(10, 0))];

        let merged = merge_timeline(events, notes);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].kind, TimelineKind::OwnerChange);
        assert_eq!(merged[1].kind, TimelineKind::Note);
        assert_eq!(merged[2].kind, TimelineKind::StatusChange);
    }

    #[test]
    fn empate_de_timestamp_preserva_ordem_de_chegada() {
        let tie = at(10, 30);
        let first = event(TimelineKind::LineAdded, tie);
        let second = event(TimelineKind::LineUpdated, tie);
        let first_id = first.id;
        let second_id = second.id;

        let merged = merge_timeline(vec![first, second], vec![]);
        assert_eq!(merged[0].id, first_id);
        assert_eq!(merged[1].id, second_id);
    }

    #[test]
    fn filtro_de_notas_descarta_eventos() {
        let merged = merge_timeline(
            vec![event(TimelineKind::StatusChange, at(9, 0))],
            vec![note("proposta enviada", at(10, 0))],
        );
        let only_notes = filter_entries(&merged, &TimelineFilter::NotesOnly);
        assert_eq!(only_notes.len(), 1);
        assert_eq!(only_notes[0].kind, TimelineKind::Note);
    }

    #[test]
    fn filtro_por_discriminante_e_reaplicavel() {
        let merged = merge_timeline(
            vec![
                event(TimelineKind::StatusChange, at(9, 0)),
                event(TimelineKind::LineAdded, at(9, 30)),
                event(TimelineKind::StatusChange, at(10, 0)),
            ],
            vec![note("ok", at(11, 0))],
        );

        let filter = TimelineFilter::Kind(TimelineKind::StatusChange);
        let once = filter_entries(&merged, &filter);
        let twice = filter_entries(&merged, &filter);
        assert_eq!(once.len(), 2);
        assert_eq!(once.len(), twice.len());
        // a fonte não é consumida nem alterada
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn parse_aceita_os_tres_formatos() {
        assert_eq!(TimelineFilter::parse(None).unwrap(), TimelineFilter::All);
        assert_eq!(
            TimelineFilter::parse(Some("all")).unwrap(),
            TimelineFilter::All
        );
        assert_eq!(
            TimelineFilter::parse(Some("notes-only")).unwrap(),
            TimelineFilter::NotesOnly
        );
        assert_eq!(
            TimelineFilter::parse(Some("STATUS_CHANGE")).unwrap(),
            TimelineFilter::Kind(TimelineKind::StatusChange)
        );
    }

    #[test]
    fn parse_rejeita_discriminante_desconhecido() {
        let err = TimelineFilter::parse(Some("QUALQUER_COISA")).unwrap_err();
        assert!(matches!(err, AppError::UnknownFilter(_)));
    }
}
