pub mod pipeline_service;
pub use pipeline_service::PipelineService;
pub mod order_service;
pub use order_service::OrderService;
pub mod conversion_service;
pub use conversion_service::ConversionService;
pub mod timeline_service;
pub use timeline_service::TimelineService;
pub mod dashboard_service;
pub use dashboard_service::DashboardService;
