pub mod dashboard;
pub mod orders;
pub mod pipeline;
pub mod timeline;
