//! API module - HTTP routes, handlers, and models

pub mod auth_handlers;
pub mod handlers;
pub mod models;
pub mod routes;
