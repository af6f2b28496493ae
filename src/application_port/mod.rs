mod auth_service;
mod request_context;

pub use auth_service::*;
pub use request_context::*;
