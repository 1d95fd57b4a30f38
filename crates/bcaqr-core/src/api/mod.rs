//! REST API client module for the QR Merchant BCA portal.
//!
//! This module provides the `ApiClient` for logging in and fetching
//! transactions. The portal issues a bearer token from its session endpoint
//! and also expects the anti-automation cookies it hands out on the login page
//! to be replayed on later requests.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthState};
pub use error::ApiError;
