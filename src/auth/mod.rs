//! HTTP login flow

pub mod service;
pub mod store;

pub use service::{normalize_phone, CodeRequest, LoginService};
pub use store::{PendingLogin, PendingLoginStore};
