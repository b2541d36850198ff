//! Core domain types and shared logic for the Bazaar shop backend.
//!
//! This crate defines the pieces shared by the store and the server:
//! - Error taxonomy for domain-level validation
//! - Configuration types
//! - Minor-unit price resolution
//! - Session token generation and hashing
//! - Email normalization

pub mod config;
pub mod email;
pub mod error;
pub mod price;
pub mod session;

pub use error::{Error, Result};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "sid";

/// Cookie carrying the cart identity token.
pub const CART_COOKIE: &str = "cart_id";

/// Rolling lifetime of the cart identity cookie, in days.
pub const CART_COOKIE_TTL_DAYS: i64 = 30;
