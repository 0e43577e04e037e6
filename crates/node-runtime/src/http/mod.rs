//! HTTP ingress.

pub mod auth;
pub mod error;
pub mod routes;

pub use auth::{AuthLayer, AuthService};
pub use error::ApiError;
pub use routes::router;
