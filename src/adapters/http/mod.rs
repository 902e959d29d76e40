//! HTTP adapter - Axum routes, handlers, and DTOs.

pub mod dto;
mod handlers;
mod routes;

pub use handlers::{AppState, SIGNATURE_HEADER};
pub use routes::{api_router, webhook_routes};
