// src/config.rs

use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{
        CatalogRepository, ClientsRepository, OrdersRepository, PipelineRepository,
        TimelineRepository, UsersRepository,
    },
    services::{
        ConversionService, DashboardService, OrderService, PipelineService, TimelineService,
    },
};

// Parâmetros de implantação do motor, lidos do ambiente uma única vez.
#[derive(Clone)]
pub struct EngineSettings {
    pub port: u16,
    pub default_tax_rate: Decimal,
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: EngineSettings,
    // O guarda de ator resolve o x-user-id direto no diretório
    pub users_repo: UsersRepository,
    pub pipeline_service: PipelineService,
    pub order_service: OrderService,
    pub conversion_service: ConversionService,
    pub timeline_service: TimelineService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        // 20% a menos que a implantação configure outra alíquota
        let default_tax_rate = env::var("DEFAULT_TAX_RATE")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or_else(|| Decimal::new(20, 2));

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        // Só o diretório de usuários guarda o pool: o guarda de ator roda
        // fora de transação. Os demais repositórios recebem o executor
        // de quem orquestra.
        let users_repo = UsersRepository::new(db_pool.clone());
        let clients_repo = ClientsRepository::new();
        let catalog_repo = CatalogRepository::new();
        let pipeline_repo = PipelineRepository::new();
        let orders_repo = OrdersRepository::new();
        let timeline_repo = TimelineRepository::new();

        let pipeline_service = PipelineService::new(
            pipeline_repo.clone(),
            clients_repo.clone(),
            users_repo.clone(),
            catalog_repo.clone(),
            timeline_repo.clone(),
        );
        let order_service = OrderService::new(
            orders_repo.clone(),
            clients_repo,
            catalog_repo,
            timeline_repo.clone(),
            default_tax_rate,
        );
        let conversion_service = ConversionService::new(
            pipeline_repo.clone(),
            orders_repo,
            timeline_repo.clone(),
            default_tax_rate,
        );
        let timeline_service = TimelineService::new(pipeline_repo.clone(), timeline_repo);
        let dashboard_service = DashboardService::new(pipeline_repo);

        Ok(Self {
            db_pool,
            settings: EngineSettings {
                port,
                default_tax_rate,
            },
            users_repo,
            pipeline_service,
            order_service,
            conversion_service,
            timeline_service,
            dashboard_service,
        })
    }
}
