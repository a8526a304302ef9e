//! Authorization header synthesis.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Header name the synthesized credentials are written under.
pub const AUTHORIZATION: &str = "Authorization";

/// Basic credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Basic <base64(username:password)>` over the UTF-8 bytes.
    pub fn header_value(&self) -> String {
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        format!("Basic {}", credentials)
    }
}

/// Compute the `Authorization` value for a request.
///
/// A bearer `token` takes precedence over `auth`. `None` when neither is set.
pub fn authorization(auth: Option<&BasicAuth>, token: Option<&str>) -> Option<String> {
    match (token, auth) {
        (Some(token), _) => Some(format!("Bearer {}", token)),
        (None, Some(auth)) => Some(auth.header_value()),
        (None, None) => None,
    }
}
