//! AnimeHub Auth
//!
//! Security layer behind the AnimeHub login flow: server-side sessions with
//! idle and absolute expiry, HMAC-bound CSRF tokens, fixed-window rate
//! limiting of auth attempts, password policy scoring and an audit trail.
//! Everything lives in process memory and is lost on restart.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod metrics;
pub mod security;
pub mod session;
pub mod shutdown;

pub use api::{AppState, AuthApi, AuthServer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{AuthError, AuthResult};
pub use session::SessionStore;
pub use shutdown::ShutdownCoordinator;

/// Common error type for startup and configuration
pub type Result<T> = anyhow::Result<T>;
