//! HTTP API handlers

pub mod agents;
pub mod auth;
pub mod billing;
pub mod catalog;
pub mod channels;
pub mod error;
pub mod expenses;
pub mod health;
pub mod leads;
pub mod profile;
pub mod reports;
pub mod stages;
pub mod studios;
pub mod webhooks;

pub use auth::auth_middleware;
pub use error::ApiError;
