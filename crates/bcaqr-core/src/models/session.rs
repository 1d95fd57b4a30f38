use serde::{Deserialize, Serialize};

/// Value of `status` the portal returns on success
pub const STATUS_SUCCESS: &str = "success";

/// Body posted to the session endpoint. `password` is the cipher output,
/// never the plaintext.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub message: String,
}

impl LoginResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}
