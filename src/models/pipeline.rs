// src/models/pipeline.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::models::ledger::{self, ItemType, LedgerLine};

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "opportunity_source", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunitySource {
    Salon,
    AppelEntrant,
    Recommandation,
    SiteWeb,
    Autre,
}

// Funil: NOUVEAU → QUALIFICATION → PROPOSITION → NEGOCIATION → {GAGNE | PERDU}.
// A progressão não é estritamente linear; os terminais é que travam a edição.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "opportunity_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityStatus {
    Nouveau,
    Qualification,
    Proposition,
    Negociation,
    Gagne,
    Perdu,
}

impl OpportunityStatus {
    pub const ALL: [OpportunityStatus; 6] = [
        OpportunityStatus::Nouveau,
        OpportunityStatus::Qualification,
        OpportunityStatus::Proposition,
        OpportunityStatus::Negociation,
        OpportunityStatus::Gagne,
        OpportunityStatus::Perdu,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, OpportunityStatus::Gagne | OpportunityStatus::Perdu)
    }

    // Probabilidade assumida quando a transição não traz um valor explícito.
    pub fn default_probability(&self) -> i32 {
        match self {
            OpportunityStatus::Nouveau => 10,
            OpportunityStatus::Qualification => 25,
            OpportunityStatus::Proposition => 50,
            OpportunityStatus::Negociation => 75,
            OpportunityStatus::Gagne => 100,
            OpportunityStatus::Perdu => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lost_reason", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LostReason {
    PrixTropEleve,
    Concurrent,
    TimingBudget,
    BesoinAnnule,
    PasDeReponse,
    Autre,
}

// --- Structs ---

// Dados de perda que acompanham uma transição para PERDU.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LostInfo {
    pub reason: LostReason,
    #[schema(example = "Orçamento congelado até o ano que vem")]
    pub comment: Option<String>,
    #[schema(example = "AgriTech SA")]
    pub competitor_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: Uuid,
    #[schema(example = "Renouvellement cuves 2026")]
    pub title: String,
    pub client_id: Uuid,
    pub owner_id: Uuid,
    #[schema(example = "Jean Martin")]
    pub contact_name: Option<String>,
    #[schema(example = "jean@vignobles-martin.fr")]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub source: OpportunitySource,
    pub status: OpportunityStatus,
    #[schema(example = 50)]
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lost_reason: Option<LostReason>,
    pub lost_comment: Option<String>,
    #[schema(example = "250.00")]
    pub manual_amount: Decimal,
    pub order_id: Option<Uuid>,
    #[schema(ignore)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    // Ganha ou perdida, a oportunidade fica somente leitura
    // (exceto reabertura via transição e notas, que nunca travam).
    pub fn ensure_editable(&self) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::OpportunityLocked);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityLine {
    pub id: Uuid,
    pub opportunity_id: Uuid,
    pub item_type: ItemType,
    pub item_id: Uuid,
    #[schema(example = "Cuve inox 500L")]
    pub product_name: String,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(example = "1250.00")]
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl LedgerLine for OpportunityLine {
    fn line_id(&self) -> Uuid {
        self.id
    }
    fn quantity(&self) -> i32 {
        self.quantity
    }
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
}

// --- Read models ---

// Cabeçalho com os nomes resolvidos por JOIN, para telas de lista e detalhe.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityWithNames {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub opportunity: Opportunity,
    #[schema(example = "Jean Martin")]
    pub client_name: String,
    #[schema(example = "Marie Dupont")]
    pub owner_name: String,
}

// Linha com o total derivado, nunca persistido.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityLineView {
    #[serde(flatten)]
    pub line: OpportunityLine,
    #[schema(example = "2500.00")]
    pub total: Decimal,
}

impl From<OpportunityLine> for OpportunityLineView {
    fn from(line: OpportunityLine) -> Self {
        let total = ledger::line_total(line.quantity, line.unit_price);
        OpportunityLineView { line, total }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDetail {
    #[serde(flatten)]
    pub header: OpportunityWithNames,
    pub lines: Vec<OpportunityLineView>,
    #[schema(example = "2500.00")]
    pub line_total: Decimal,
    #[schema(example = "2750.00")]
    pub amount: Decimal,
    #[schema(example = "1375.00")]
    pub weighted_amount: Decimal,
}

impl OpportunityDetail {
    // Os valores derivados saem sempre do razão, no momento da leitura.
    pub fn assemble(header: OpportunityWithNames, lines: Vec<OpportunityLine>) -> Self {
        let totals = ledger::compute_totals(&lines, header.opportunity.manual_amount);
        let weighted = weighted_amount(totals.grand_total, header.opportunity.probability);
        OpportunityDetail {
            header,
            lines: lines.into_iter().map(OpportunityLineView::from).collect(),
            line_total: totals.line_total,
            amount: totals.grand_total,
            weighted_amount: weighted,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunitySummary {
    pub id: Uuid,
    pub title: String,
    pub client_name: String,
    pub owner_name: String,
    pub status: OpportunityStatus,
    pub probability: i32,
    #[schema(example = "2750.00")]
    pub amount: Decimal,
    #[schema(example = "1375.00")]
    pub weighted_amount: Decimal,
    pub expected_close_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl OpportunitySummary {
    pub fn from_header(header: &OpportunityWithNames, lines: &[OpportunityLine]) -> Self {
        let totals = ledger::compute_totals(lines, header.opportunity.manual_amount);
        OpportunitySummary {
            id: header.opportunity.id,
            title: header.opportunity.title.clone(),
            client_name: header.client_name.clone(),
            owner_name: header.owner_name.clone(),
            status: header.opportunity.status,
            probability: header.opportunity.probability,
            amount: totals.grand_total,
            weighted_amount: weighted_amount(
                totals.grand_total,
                header.opportunity.probability,
            ),
            expected_close_date: header.opportunity.expected_close_date,
            updated_at: header.opportunity.updated_at,
        }
    }
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOpportunityPayload {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "O título não pode ser vazio"))]
    #[schema(example = "Renouvellement cuves 2026")]
    pub title: String,
    pub contact_name: Option<String>,
    #[validate(email(message = "E-mail de contato inválido"))]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub source: OpportunitySource,
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[schema(example = "250.00")]
    pub manual_amount: Option<Decimal>,
}

// Patch parcial: só os campos presentes são alterados.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOpportunityPayload {
    #[validate(length(min = 1, message = "O título não pode ser vazio"))]
    pub title: Option<String>,
    pub contact_name: Option<String>,
    #[validate(email(message = "E-mail de contato inválido"))]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub source: Option<OpportunitySource>,
    #[validate(range(min = 0, max = 100, message = "A probabilidade deve estar entre 0 e 100"))]
    pub probability: Option<i32>,
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub manual_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    pub status: OpportunityStatus,
    #[validate(range(min = 0, max = 100, message = "A probabilidade deve estar entre 0 e 100"))]
    pub probability: Option<i32>,
    pub lost_reason: Option<LostReason>,
    pub lost_comment: Option<String>,
    pub competitor_name: Option<String>,
}

impl TransitionPayload {
    pub fn lost_info(&self) -> Option<LostInfo> {
        self.lost_reason.map(|reason| LostInfo {
            reason,
            comment: self.lost_comment.clone(),
            competitor_name: self.competitor_name.clone(),
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReassignPayload {
    pub new_owner_id: Uuid,
}

// --- Regras de transição ---

// Valida os dados de perda exigidos por uma transição para PERDU.
pub fn validate_lost_info(lost: Option<&LostInfo>) -> Result<(), AppError> {
    let info = lost.ok_or(AppError::LostReasonRequired)?;
    if info.reason == LostReason::Autre {
        let has_comment = info
            .comment
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false);
        if !has_comment {
            return Err(AppError::CommentRequired);
        }
    }
    Ok(())
}

// Regra pura da máquina de estados, sem tocar banco:
// - entre estados abertos o movimento é livre (o funil não é linear);
// - GAGNE/PERDU só se alcançam a partir de um estado aberto;
// - reabrir um terminal é permitido e limpa os dados de perda;
// - terminal para terminal não existe: reabra primeiro.
pub fn check_transition(
    current: OpportunityStatus,
    next: OpportunityStatus,
    lost: Option<&LostInfo>,
) -> Result<(), AppError> {
    if current.is_terminal() && next.is_terminal() {
        return Err(AppError::OpportunityLocked);
    }
    if current == next {
        return Err(AppError::InvalidStatusTransition(format!(
            "a oportunidade já está em {:?}",
            current
        )));
    }
    if next == OpportunityStatus::Perdu {
        validate_lost_info(lost)?;
    }
    Ok(())
}

// Ponderação da previsão de receita pela chance de fechamento.
pub fn weighted_amount(amount: Decimal, probability: i32) -> Decimal {
    (amount * Decimal::from(probability) / Decimal::ONE_HUNDRED).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn lost(reason: LostReason, comment: Option<&str>) -> LostInfo {
        LostInfo {
            reason,
            comment: comment.map(String::from),
            competitor_name: None,
        }
    }

    #[rstest]
    #[case(OpportunityStatus::Nouveau, 10)]
    #[case(OpportunityStatus::Qualification, 25)]
    #[case(OpportunityStatus::Proposition, 50)]
    #[case(OpportunityStatus::Negociation, 75)]
    #[case(OpportunityStatus::Gagne, 100)]
    #[case(OpportunityStatus::Perdu, 0)]
    fn probabilidade_padrao_por_status(#[case] status: OpportunityStatus, #[case] expected: i32) {
        assert_eq!(status.default_probability(), expected);
    }

    #[rstest]
    #[case(OpportunityStatus::Nouveau, false)]
    #[case(OpportunityStatus::Negociation, false)]
    #[case(OpportunityStatus::Gagne, true)]
    #[case(OpportunityStatus::Perdu, true)]
    fn terminais_sao_gagne_e_perdu(#[case] status: OpportunityStatus, #[case] terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
    }

    #[rstest]
    #[case(OpportunityStatus::Nouveau, OpportunityStatus::Negociation)]
    #[case(OpportunityStatus::Negociation, OpportunityStatus::Qualification)]
    #[case(OpportunityStatus::Proposition, OpportunityStatus::Gagne)]
    fn estados_abertos_se_movem_livremente(
        #[case] from: OpportunityStatus,
        #[case] to: OpportunityStatus,
    ) {
        assert!(check_transition(from, to, None).is_ok());
    }

    #[test]
    fn perder_sem_motivo_e_rejeitado() {
        let err =
            check_transition(OpportunityStatus::Negociation, OpportunityStatus::Perdu, None)
                .unwrap_err();
        assert!(matches!(err, AppError::LostReasonRequired));
    }

    #[test]
    fn motivo_autre_exige_comentario() {
        let info = lost(LostReason::Autre, None);
        let err = check_transition(
            OpportunityStatus::Negociation,
            OpportunityStatus::Perdu,
            Some(&info),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::CommentRequired));

        let blank = lost(LostReason::Autre, Some("   "));
        assert!(check_transition(
            OpportunityStatus::Negociation,
            OpportunityStatus::Perdu,
            Some(&blank),
        )
        .is_err());
    }

    #[test]
    fn motivo_autre_com_comentario_passa() {
        let info = lost(LostReason::Autre, Some("Projeto adiado sem prazo"));
        assert!(check_transition(
            OpportunityStatus::Proposition,
            OpportunityStatus::Perdu,
            Some(&info),
        )
        .is_ok());
    }

    #[test]
    fn motivo_concurrent_nao_exige_comentario() {
        let info = lost(LostReason::Concurrent, None);
        assert!(check_transition(
            OpportunityStatus::Negociation,
            OpportunityStatus::Perdu,
            Some(&info),
        )
        .is_ok());
    }

    #[test]
    fn reabrir_terminal_e_permitido() {
        assert!(check_transition(
            OpportunityStatus::Gagne,
            OpportunityStatus::Negociation,
            None,
        )
        .is_ok());
        assert!(check_transition(
            OpportunityStatus::Perdu,
            OpportunityStatus::Qualification,
            None,
        )
        .is_ok());
    }

    #[rstest]
    #[case(OpportunityStatus::Gagne, OpportunityStatus::Perdu)]
    #[case(OpportunityStatus::Perdu, OpportunityStatus::Gagne)]
    #[case(OpportunityStatus::Gagne, OpportunityStatus::Gagne)]
    fn terminal_para_terminal_fica_travado(
        #[case] from: OpportunityStatus,
        #[case] to: OpportunityStatus,
    ) {
        let info = lost(LostReason::Concurrent, None);
        let err = check_transition(from, to, Some(&info)).unwrap_err();
        assert!(matches!(err, AppError::OpportunityLocked));
    }

    #[test]
    fn permanecer_no_mesmo_status_e_rejeitado() {
        let err = check_transition(
            OpportunityStatus::Proposition,
            OpportunityStatus::Proposition,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidStatusTransition(_)));
    }

    #[test]
    fn oportunidade_terminal_nao_e_editavel() {
        let mut opp = fixture_opportunity(OpportunityStatus::Negociation);
        assert!(opp.ensure_editable().is_ok());

        opp.status = OpportunityStatus::Gagne;
        assert!(matches!(
            opp.ensure_editable(),
            Err(AppError::OpportunityLocked)
        ));

        opp.status = OpportunityStatus::Perdu;
        assert!(matches!(
            opp.ensure_editable(),
            Err(AppError::OpportunityLocked)
        ));
    }

    #[test]
    fn ponderacao_aplica_probabilidade() {
        assert_eq!(weighted_amount(d("200.00"), 50), d("100.00"));
        assert_eq!(weighted_amount(d("200.00"), 100), d("200.00"));
        assert_eq!(weighted_amount(d("200.00"), 0), d("0.00"));
        assert_eq!(weighted_amount(d("99.99"), 33), d("33.00"));
    }

    #[test]
    fn detalhe_deriva_valores_do_razao() {
        let opp = fixture_opportunity(OpportunityStatus::Proposition);
        let opp_id = opp.id;
        let header = OpportunityWithNames {
            opportunity: opp,
            client_name: "Jean Martin".to_string(),
            owner_name: "Marie Dupont".to_string(),
        };
        let lines = vec![
            fixture_line(opp_id, 2, "50.00"),
            fixture_line(opp_id, 1, "100.00"),
        ];
        let detail = OpportunityDetail::assemble(header, lines);
        assert_eq!(detail.line_total, d("200.00"));
        // manual_amount 250.00 entra no total geral
        assert_eq!(detail.amount, d("450.00"));
        // probabilidade 50
        assert_eq!(detail.weighted_amount, d("225.00"));
        assert_eq!(detail.lines.len(), 2);
        assert_eq!(detail.lines[0].total, d("100.00"));
    }

    fn fixture_opportunity(status: OpportunityStatus) -> Opportunity {
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
            probability: 50,
            expected_close_date: None,
            notes: None,
            lost_reason: None,
            lost_comment: None,
            manual_amount: d("250.00"),
            order_id: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fixture_line(opportunity_id: Uuid, quantity: i32, unit_price: &str) -> OpportunityLine {
        OpportunityLine {
            id: Uuid::new_v4(),
            opportunity_id,
            item_type: ItemType::Product,
            item_id: Uuid::new_v4(),
            product_name: "Cuve inox 500L".to_string(),
            quantity,
            unit_price: d(unit_price),
            created_at: Utc::now(),
        }
    }
}
