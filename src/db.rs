pub mod users_repo;
pub use users_repo::UsersRepository;
pub mod clients_repo;
pub use clients_repo::ClientsRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod pipeline_repo;
pub use pipeline_repo::PipelineRepository;
pub mod orders_repo;
pub use orders_repo::OrdersRepository;
pub mod timeline_repo;
pub use timeline_repo::TimelineRepository;
