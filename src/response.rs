//! Outgoing HTTP response type and the [`ResponseWriter`] seam.
//!
//! The dispatcher ends every request by handing the pipeline outcome to a
//! `ResponseWriter`. Unless one is configured, [`JsonResponseWriter`] is used:
//!
//! | Outcome | Status | Body |
//! |---|---|---|
//! | `Ok(bytes)` | 200 | `bytes`, untouched |
//! | `Err(e)` | `e.status_code()` | `{"message": e.message(), "status": "error"}` |
//!
//! In both cases `content-type` is `application/json`, even when a handler
//! returns bytes that are not JSON. Clients depend on that header being
//! constant, so handlers that emit other formats should install their own
//! writer.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

use crate::api_error::ApiError;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
#[derive(Clone, Copy, Debug)]
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use wicket::{ContentType, Response};
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/widgets/42")
///     .json(br#"{"id":42}"#.to_vec());
///
/// Response::builder().bytes(ContentType::Xml, b"<ok/>".to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    body: Vec<u8>,
    headers: HeaderMap,
    status: StatusCode,
}

impl Response {
    /// `200 OK` — `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// The standard error body for `err`, with `err`'s status code.
    pub fn error(err: &ApiError) -> Self {
        Self::builder().status(err.status_code()).json(err.message_bytes())
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
#[derive(Debug)]
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Appends a header. Names or values that are not valid HTTP are dropped
    /// with a warning rather than failing the whole response.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!(header = name, "dropping invalid response header"),
        }
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish(ContentType::Json, body)
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text, body.into().into_bytes())
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(content_type, body)
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }

    fn finish(mut self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        Response { body, headers: self.headers, status: self.status }
    }
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// Turns the outcome of a request into the response sent to the client.
///
/// Called exactly once per request. A custom writer has full control over
/// status, headers and body. Any `Fn(Result<Vec<u8>, ApiError>) -> Response`
/// closure is a writer:
///
/// ```rust
/// use wicket::{ApiError, Response};
///
/// let writer = |outcome: Result<Vec<u8>, ApiError>| match outcome {
///     Ok(body) => Response::builder().header("x-served-by", "orders").json(body),
///     Err(e) => Response::status(e.status_code()),
/// };
/// # let _ = writer;
/// ```
pub trait ResponseWriter: Send + Sync + 'static {
    fn write(&self, outcome: Result<Vec<u8>, ApiError>) -> Response;
}

impl<F> ResponseWriter for F
where
    F: Fn(Result<Vec<u8>, ApiError>) -> Response + Send + Sync + 'static,
{
    fn write(&self, outcome: Result<Vec<u8>, ApiError>) -> Response {
        self(outcome)
    }
}

/// The default writer. See the module docs for the exact wire format.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonResponseWriter;

impl ResponseWriter for JsonResponseWriter {
    fn write(&self, outcome: Result<Vec<u8>, ApiError>) -> Response {
        match outcome {
            Ok(body) => Response::json(body),
            Err(e) => Response::error(&e),
        }
    }
}
