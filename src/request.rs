//! The per-request context handed to handler stages.

use http::{Extensions, HeaderMap, Method};
use serde_json::{Map, Value};

use crate::log::LogRecord;

/// Decoded request body: a JSON object, or the query pairs of a GET.
pub type Body = Map<String, Value>;

/// Credentials attached to a request by a successful authentication stage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserInfo {
    pub username: String,
    pub password: Option<String>,
}

impl UserInfo {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into(), password: None }
    }

    pub fn with_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: Some(password.into()) }
    }
}

/// Everything the dispatcher knows about one in-flight request.
///
/// Created when the request arrives, mutated by the authentication stage
/// (context and user) and by handler code (log lines), dropped once the
/// response is written and the log flushed.
#[derive(Debug)]
pub struct RouteDetails {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Body>,
    pub(crate) context: Extensions,
    pub(crate) user: Option<UserInfo>,
    pub(crate) log: LogRecord,
}

impl RouteDetails {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers: HeaderMap,
        body: Option<Body>,
        context: Extensions,
        log: LogRecord,
    ) -> Self {
        Self { method, path: path.into(), headers, body, context, user: None, log }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// `None` for a non-GET request that arrived without a body.
    pub fn body(&self) -> Option<&Body> { self.body.as_ref() }

    /// Request-scoped values: whatever the server put in the request's
    /// extensions, replaced wholesale if authentication returned a new context.
    pub fn context(&self) -> &Extensions { &self.context }

    pub fn user(&self) -> Option<&UserInfo> { self.user.as_ref() }

    /// First value of a header, if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Looks up a top-level body field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body.as_ref()?.get(key)
    }

    pub fn log(&mut self) -> &mut LogRecord { &mut self.log }

    /// The text logged so far for this request.
    pub fn log_text(&self) -> &str { self.log.as_str() }
}
