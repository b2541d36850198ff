//! HTTP API server for the Bazaar shop backend.
//!
//! This crate provides the HTTP plane:
//! - Identity resolution from session cookies
//! - Cart read/mutate endpoints and checkout
//! - Registration, login, logout, and order history
//! - Product catalog read endpoints
//! - Error-to-status translation

pub mod auth;
pub mod catalog;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod summary;

pub use auth::CurrentUser;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
