//! The closed set of request-level failures.
//!
//! Every stage of a handler returns one of these instead of writing a
//! response itself. The dispatcher is the only place they become HTTP.
//!
//! | Variant | Status | Fallback message |
//! |---|---|---|
//! | `Authentication` | 403 | the diagnostic |
//! | `Authorization` | 401 | the diagnostic |
//! | `InvalidInput` | 400 | the diagnostic |
//! | `Internal` | 500 | `Internal Error, please contact admin` |
//! | `InvalidMethod` | 405 | `Invalid Method` |
//! | `CustomStatus` | caller supplied | `Invalid Method` |
//!
//! `CustomStatus` falling back to `Invalid Method` is inherited behaviour that
//! existing clients may match on. Set an explicit message to avoid it.

use http::StatusCode;

const INTERNAL_MESSAGE: &str = "Internal Error, please contact admin";
const INVALID_METHOD_MESSAGE: &str = "Invalid Method";

/// A request-level failure.
///
/// `err` is the internal diagnostic: it goes to the request log and never to
/// the client. `message` is what the client sees; when it is unset (or empty)
/// each variant falls back as described in the module docs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("{err}")]
    Authentication { err: String, message: Option<String> },

    #[error("{err}")]
    Authorization { err: String, message: Option<String> },

    #[error("{err}")]
    InvalidInput { err: String, message: Option<String> },

    #[error("{err}")]
    Internal { err: String, message: Option<String> },

    #[error("{err}")]
    InvalidMethod { err: String, message: Option<String> },

    #[error("{err}")]
    CustomStatus { err: String, message: Option<String>, status: StatusCode },
}

impl ApiError {
    pub fn authentication(err: impl Into<String>) -> Self {
        Self::Authentication { err: err.into(), message: None }
    }

    pub fn authorization(err: impl Into<String>) -> Self {
        Self::Authorization { err: err.into(), message: None }
    }

    pub fn invalid_input(err: impl Into<String>) -> Self {
        Self::InvalidInput { err: err.into(), message: None }
    }

    pub fn internal(err: impl Into<String>) -> Self {
        Self::Internal { err: err.into(), message: None }
    }

    pub fn invalid_method(err: impl Into<String>) -> Self {
        Self::InvalidMethod { err: err.into(), message: None }
    }

    pub fn custom_status(status: StatusCode, err: impl Into<String>) -> Self {
        Self::CustomStatus { err: err.into(), message: None, status }
    }

    /// Sets the client-facing message, keeping the diagnostic.
    pub fn with_message(mut self, user_message: impl Into<String>) -> Self {
        let slot = match &mut self {
            Self::Authentication { message, .. }
            | Self::Authorization { message, .. }
            | Self::InvalidInput { message, .. }
            | Self::Internal { message, .. }
            | Self::InvalidMethod { message, .. }
            | Self::CustomStatus { message, .. } => message,
        };
        *slot = Some(user_message.into());
        self
    }

    /// The internal diagnostic. Log it, never send it.
    pub fn diagnostic(&self) -> &str {
        match self {
            Self::Authentication { err, .. }
            | Self::Authorization { err, .. }
            | Self::InvalidInput { err, .. }
            | Self::Internal { err, .. }
            | Self::InvalidMethod { err, .. }
            | Self::CustomStatus { err, .. } => err,
        }
    }

    /// The message sent to the client.
    pub fn message(&self) -> &str {
        let (explicit, fallback) = match self {
            Self::Authentication { err, message }
            | Self::Authorization { err, message }
            | Self::InvalidInput { err, message } => (message, err.as_str()),
            Self::Internal { message, .. } => (message, INTERNAL_MESSAGE),
            Self::InvalidMethod { message, .. } | Self::CustomStatus { message, .. } => {
                (message, INVALID_METHOD_MESSAGE)
            }
        };
        match explicit.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => fallback,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication { .. } => StatusCode::FORBIDDEN,
            Self::Authorization { .. } => StatusCode::UNAUTHORIZED,
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidMethod { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::CustomStatus { status, .. } => *status,
        }
    }

    /// The wire body for this error: `{"message": ..., "status": "error"}`.
    pub fn message_bytes(&self) -> Vec<u8> {
        serde_json::json!({
            "message": self.message(),
            "status": "error",
        })
        .to_string()
        .into_bytes()
    }
}
