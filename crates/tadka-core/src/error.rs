//! Error types for the Tadka client core

use thiserror::Error;

/// Result type alias for token store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for gateway requests
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result type alias for authentication flows
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised by a durable token store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token store backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("Stored credential is not valid UTF-8")]
    Corrupt,
}

/// Classified outcome of a failed gateway request.
///
/// The gateway never retries and never touches the token store: callers decide
/// what an `Unauthorized` means for the session.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// 401 or 403. The session should be treated as invalid.
    #[error("Unauthorized ({status})")]
    Unauthorized {
        status: u16,
        message: Option<String>,
    },

    /// Any other 4xx, with the server-provided message when one was sent.
    #[error("Request rejected ({status}): {}", message.as_deref().unwrap_or("no detail"))]
    ClientError {
        status: u16,
        message: Option<String>,
    },

    #[error("Server error ({status})")]
    ServerError {
        status: u16,
        message: Option<String>,
    },

    /// No response was received: timeout, DNS failure, connection refused.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 2xx whose body could not be decoded into the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The path was not a relative API path; nothing was sent.
    #[error("Refusing to send to non-API path: {0}")]
    InvalidPath(String),
}

impl GatewayError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized { .. })
    }

    /// Server-provided detail text, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            GatewayError::Unauthorized { message, .. }
            | GatewayError::ClientError { message, .. }
            | GatewayError::ServerError { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text to show the user: the server detail when present, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Errors from login, registration and logout
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication request failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Could not persist credential: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AuthError::Gateway(e) => e.user_message(fallback),
            AuthError::Store(_) => fallback.to_string(),
        }
    }
}
