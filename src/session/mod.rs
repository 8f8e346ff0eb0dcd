//! Session Module
//!
//! Handles session creation, validation, activity tracking and revocation.

pub mod store;
pub mod types;

pub use store::SessionStore;
pub use types::{RequestContext, SessionRecord};
