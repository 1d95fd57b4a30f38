//! Core library for bcaqr.
//!
//! Talks to the QR Merchant BCA portal: encrypts credentials the way the
//! portal's web client does, exchanges them for a bearer token, persists the
//! session (token plus cookies) between invocations and fetches a day's
//! transactions.

pub mod api;
pub mod auth;
pub mod cipher;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, AuthState};
pub use auth::{default_session_path, SessionData, StoredCookie};
pub use config::Config;
pub use models::Transaction;
