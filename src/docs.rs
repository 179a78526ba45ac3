// src/docs.rs

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Pipeline ---
        handlers::pipeline::list_opportunities,
        handlers::pipeline::create_opportunity,
        handlers::pipeline::get_opportunity,
        handlers::pipeline::update_opportunity,
        handlers::pipeline::delete_opportunity,
        handlers::pipeline::transition_opportunity,
        handlers::pipeline::reassign_opportunity,
        handlers::pipeline::convert_opportunity,
        handlers::pipeline::add_opportunity_line,
        handlers::pipeline::update_opportunity_line,
        handlers::pipeline::remove_opportunity_line,

        // --- Orders ---
        handlers::orders::list_orders,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::transition_order,
        handlers::orders::add_order_line,
        handlers::orders::update_order_line,
        handlers::orders::remove_order_line,

        // --- Timeline ---
        handlers::timeline::get_timeline,
        handlers::timeline::add_note,

        // --- Dashboard ---
        handlers::dashboard::get_pipeline_summary,
    ),
    components(
        schemas(
            // --- Pipeline ---
            models::pipeline::OpportunitySource,
            models::pipeline::OpportunityStatus,
            models::pipeline::LostReason,
            models::pipeline::LostInfo,
            models::pipeline::Opportunity,
            models::pipeline::OpportunityLine,
            models::pipeline::OpportunityWithNames,
            models::pipeline::OpportunityLineView,
            models::pipeline::OpportunityDetail,
            models::pipeline::OpportunitySummary,
            models::pipeline::CreateOpportunityPayload,
            models::pipeline::UpdateOpportunityPayload,
            models::pipeline::TransitionPayload,
            models::pipeline::ReassignPayload,

            // --- Ledger ---
            models::ledger::ItemType,
            models::ledger::Totals,
            models::ledger::AddLinePayload,
            models::ledger::UpdateLineQuantityPayload,

            // --- Orders ---
            models::orders::OrderStatus,
            models::orders::Order,
            models::orders::OrderLine,
            models::orders::OrderWithNames,
            models::orders::OrderLineView,
            models::orders::OrderDetail,
            models::orders::CreateOrderPayload,
            models::orders::UpdateOrderPayload,
            models::orders::OrderTransitionPayload,

            // --- Timeline ---
            models::timeline::TimelineKind,
            models::timeline::TimelineEntry,
            models::timeline::AddNotePayload,

            // --- Colaboradores externos ---
            models::users::Role,
            models::users::User,
            models::clients::Client,
            models::catalog::Product,
            models::catalog::ProductKit,

            // --- Dashboard ---
            models::dashboard::PipelineStageSummary,
            models::dashboard::PipelineSummary,
        )
    ),
    tags(
        (name = "Pipeline", description = "Oportunidades: funil, linhas e conversão"),
        (name = "Orders", description = "Pedidos: criação manual, linhas e preparo"),
        (name = "Timeline", description = "Histórico unificado e notas"),
        (name = "Dashboard", description = "Agregados do funil")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        // O ator chega pelo cabeçalho x-user-id; sessão fica fora deste motor
        components.add_security_scheme(
            "actor_id",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-user-id"))),
        );
    }
}
