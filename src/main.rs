//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::actor_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let opportunity_routes = Router::new()
        .route(
            "/",
            get(handlers::pipeline::list_opportunities).post(handlers::pipeline::create_opportunity),
        )
        .route(
            "/{id}",
            get(handlers::pipeline::get_opportunity)
                .patch(handlers::pipeline::update_opportunity)
                .delete(handlers::pipeline::delete_opportunity),
        )
        .route("/{id}/transition", post(handlers::pipeline::transition_opportunity))
        .route("/{id}/assign", post(handlers::pipeline::reassign_opportunity))
        .route("/{id}/convert", post(handlers::pipeline::convert_opportunity))
        .route("/{id}/lines", post(handlers::pipeline::add_opportunity_line))
        .route(
            "/{id}/lines/{line_id}",
            axum::routing::patch(handlers::pipeline::update_opportunity_line)
                .delete(handlers::pipeline::remove_opportunity_line),
        )
        .route("/{id}/timeline", get(handlers::timeline::get_timeline))
        .route("/{id}/notes", post(handlers::timeline::add_note));

    let order_routes = Router::new()
        .route(
            "/",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/{id}",
            get(handlers::orders::get_order).patch(handlers::orders::update_order),
        )
        .route("/{id}/transition", post(handlers::orders::transition_order))
        .route("/{id}/lines", post(handlers::orders::add_order_line))
        .route(
            "/{id}/lines/{line_id}",
            axum::routing::patch(handlers::orders::update_order_line)
                .delete(handlers::orders::remove_order_line),
        );

    let dashboard_routes =
        Router::new().route("/pipeline", get(handlers::dashboard::get_pipeline_summary));

    // Tudo menos o health check exige um ator resolvido pelo x-user-id
    let api = Router::new()
        .nest("/api/opportunities", opportunity_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/dashboard", dashboard_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            actor_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .merge(api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state.clone());

    let addr = format!("0.0.0.0:{}", app_state.settings.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
