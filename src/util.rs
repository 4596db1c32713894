//! Small helpers for handlers and their outbound calls.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::StatusCode;

/// `Authorization` header value for HTTP basic auth.
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// True for 200, 201 and 202 only. Other 2xx codes (204 included) are not
/// treated as success by callers of downstream services.
pub fn is_success(status: StatusCode) -> bool {
    matches!(status, StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED)
}
