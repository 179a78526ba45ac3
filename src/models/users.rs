// src/models/users.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// --- Enums ---

// Perfil do usuário dentro do funil comercial. O DISTRIBUTEUR enxerga tudo,
// mas não escreve nada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    ResponsableFiliere,
    Commercial,
    Distributeur,
}

impl Role {
    // Perfis que podem ser donos de uma oportunidade.
    pub fn can_own_opportunities(&self) -> bool {
        !matches!(self, Role::Distributeur)
    }
}

// Cada operação de escrita do motor consulta esta lista, nunca o perfil direto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateOpportunity,
    EditOpportunity,
    TransitionOpportunity,
    ReassignOpportunity,
    ConvertOpportunity,
    DeleteOpportunity,
    AddNote,
    CreateOrder,
    EditOrder,
    TransitionOrder,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "Marie Dupont")]
    pub name: String,
    #[schema(example = "marie.dupont@exemple.fr")]
    pub email: String,
    pub role: Role,
    #[schema(example = true)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// --- Política de autorização ---

// Função única de política: todo caminho de escrita pergunta aqui.
pub fn can_perform(role: Role, action: Action) -> bool {
    match role {
        // Distribuidor nunca escreve neste motor.
        Role::Distributeur => false,
        // Reatribuição e exclusão são atos de gestão do funil.
        Role::Commercial => !matches!(
            action,
            Action::ReassignOpportunity | Action::DeleteOpportunity
        ),
        Role::Admin | Role::ResponsableFiliere => true,
    }
}

// Versão `Result` para encadear com `?` nos serviços.
pub fn ensure_can(role: Role, action: Action) -> Result<(), AppError> {
    if can_perform(role, action) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Role::Admin, Action::ReassignOpportunity, true)]
    #[case(Role::ResponsableFiliere, Action::ReassignOpportunity, true)]
    #[case(Role::Commercial, Action::ReassignOpportunity, false)]
    #[case(Role::Distributeur, Action::ReassignOpportunity, false)]
    #[case(Role::Admin, Action::DeleteOpportunity, true)]
    #[case(Role::Commercial, Action::DeleteOpportunity, false)]
    fn gestao_do_funil_exige_perfil_gestor(
        #[case] role: Role,
        #[case] action: Action,
        #[case] expected: bool,
    ) {
        assert_eq!(can_perform(role, action), expected);
    }

    #[rstest]
    #[case(Action::CreateOpportunity)]
    #[case(Action::EditOpportunity)]
    #[case(Action::TransitionOpportunity)]
    #[case(Action::ConvertOpportunity)]
    #[case(Action::AddNote)]
    #[case(Action::CreateOrder)]
    #[case(Action::EditOrder)]
    #[case(Action::TransitionOrder)]
    fn comercial_escreve_no_proprio_funil(#[case] action: Action) {
        assert!(can_perform(Role::Commercial, action));
    }

    #[rstest]
    #[case(Action::CreateOpportunity)]
    #[case(Action::EditOpportunity)]
    #[case(Action::TransitionOpportunity)]
    #[case(Action::ReassignOpportunity)]
    #[case(Action::ConvertOpportunity)]
    #[case(Action::DeleteOpportunity)]
    #[case(Action::AddNote)]
    #[case(Action::CreateOrder)]
    #[case(Action::EditOrder)]
    #[case(Action::TransitionOrder)]
    fn distribuidor_nunca_escreve(#[case] action: Action) {
        assert!(!can_perform(Role::Distributeur, action));
        assert!(ensure_can(Role::Distributeur, action).is_err());
    }

    #[test]
    fn ensure_can_devolve_forbidden() {
        let err = ensure_can(Role::Commercial, Action::ReassignOpportunity).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn distribuidor_nao_pode_ser_dono() {
        assert!(!Role::Distributeur.can_own_opportunities());
        assert!(Role::Commercial.can_own_opportunities());
        assert!(Role::Admin.can_own_opportunities());
    }
}
