pub mod users;
pub use users::{Action, Role, User};
pub mod clients;
pub use clients::Client;
pub mod catalog;
pub use catalog::CatalogItem;
pub mod ledger;
pub mod pipeline;
pub mod orders;
pub mod timeline;
pub mod dashboard;
