//! Hosted data/auth service integration.

mod auth;
pub mod client;
pub mod query;
pub mod types;

pub use client::BackendClient;
pub use query::{Direction, Filter, TableQuery};
pub use types::{AuthSession, AuthUser, BackendError};
