use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {}", truncate_body(.body))]
    Status { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not logged in - call login() first")]
    NotLoggedIn,

    #[error("No active session to save")]
    NoActiveSession,

    #[error("Session expired (saved at {saved_at}), please login again")]
    SessionExpired { saved_at: DateTime<Utc> },

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("Invalid date format, use YYYY-MM-DD: {0}")]
    InvalidDate(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid printing excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::Status {
            status: status.as_u16(),
            body: body.to_string(),
        }
    }

    /// Network failures and unexpected HTTP statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_includes_code_and_body() {
        let err = ApiError::from_status(reqwest::StatusCode::FORBIDDEN, "blocked by waf");
        assert!(err.is_transport());
        assert_eq!(
            err.to_string(),
            "Request failed with status 403: blocked by waf"
        );
    }

    #[test]
    fn test_long_body_is_truncated_in_display() {
        let body = "x".repeat(2000);
        let err = ApiError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        let msg = err.to_string();
        assert!(msg.contains("truncated, 2000 total bytes"));
        assert!(msg.len() < 600);

        // The raw body is kept intact on the variant
        match err {
            ApiError::Status { body: raw, .. } => assert_eq!(raw.len(), 2000),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "é".repeat(400);
        let truncated = truncate_body(&body);
        assert!(truncated.starts_with('é'));
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_authentication_carries_message() {
        let err = ApiError::Authentication("invalid credentials".to_string());
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "Authentication failed: invalid credentials");
    }
}
