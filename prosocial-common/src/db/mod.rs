//! Database schema, models and queries

pub mod agents;
pub mod billing;
pub mod catalog;
pub mod expenses;
pub mod init;
pub mod leads;
pub mod lookups;
pub mod migrations;
pub mod models;
pub mod reports;
pub mod settings;
pub mod stages;
pub mod studios;

pub use init::init_database;
pub use migrations::run_migrations;
pub use models::*;
