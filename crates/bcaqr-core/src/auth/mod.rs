//! Session persistence.
//!
//! This module provides:
//! - `SessionData`: token, cookies and base URL snapshot written after login
//! - `StoredCookie`: on-disk form of a cookie from the client's cookie store
//! - `default_session_path`: where the session file lives
//!
//! Sessions are reused across invocations for 24 hours, after which the user
//! must login again. Expired files are left in place.

pub mod cookies;
pub mod session;

pub use cookies::StoredCookie;
pub use session::{default_session_path, SessionData, SESSION_FILE_NAME, SESSION_MAX_AGE_HOURS};
