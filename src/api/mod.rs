//! Auth HTTP API
//!
//! JSON endpoints under `/api/auth`, plus `/health` and `/metrics`.

pub mod api;
pub mod guard;
pub mod handlers;
pub mod server;
pub mod types;

pub use api::AuthApi;
pub use handlers::AppState;
pub use server::AuthServer;
