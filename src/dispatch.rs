//! The single entry point every request goes through.
//!
//! # Life of a request
//!
//! ```text
//! serve_request
//!   ├─ RouteDetails::new          decoded path, fresh context, empty LogRecord
//!   ├─ log "Incoming Request …"
//!   ├─ catch_panic ┬─ read_body    GET → query pairs, else first JSON object
//!   │              ├─ lookup       exact (method, path)   miss or undecodable path → 403
//!   │              └─ handle_request   auth → validate → call
//!   ├─ panic?      log PANIC + trace, outcome = Internal("Unknown server error")
//!   ├─ sink.flush  exactly once, every path, under catch_sync
//!   └─ writer.write(outcome)
//! ```
//!
//! A missing route is reported as an authentication failure (403), not 404.
//! Deployed clients rely on that status, so it stays.
//!
//! Routes are matched against the percent-decoded path. A path that does not
//! decode to UTF-8 matches nothing.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::Method;
use http_body::Body as HttpBody;
use http_body_util::{BodyExt, Full};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::api_error::ApiError;
use crate::config::Environment;
use crate::handler::handle_request;
use crate::log::{LogRecord, TimeFormat, default_time_format};
use crate::panic::{catch_panic, catch_sync, install_hook};
use crate::request::{Body, RouteDetails};
use crate::response::{JsonResponseWriter, Response, ResponseWriter};
use crate::router::RouteTable;
use crate::sink::{LogSink, TracingSink};

/// Routes requests through their handler pipeline and answers every one of
/// them, whatever happens on the way.
///
/// Cheap to share: wrap it in an `Arc` (the [`Server`](crate::Server) does)
/// and call [`serve_request`](Dispatcher::serve_request) from any number of
/// tasks.
///
/// Building a dispatcher installs a process-wide panic hook that chains to
/// the hook current at that moment. Set any custom hook with
/// `std::panic::set_hook` *before* building; one set afterwards replaces
/// wicket's, and PANIC log lines lose their file, line and trace.
pub struct Dispatcher {
    routes: RouteTable,
    writer: Box<dyn ResponseWriter>,
    sink: Arc<dyn LogSink>,
    environment: Environment,
    time_format: TimeFormat,
}

/// Wires a route table, an optional response writer and a log sink into a
/// [`Dispatcher`], ready to be passed to [`Server::serve`](crate::Server::serve).
///
/// `None` for the writer selects [`JsonResponseWriter`].
pub fn register_routes(
    routes: RouteTable,
    writer: Option<Box<dyn ResponseWriter>>,
    sink: Arc<dyn LogSink>,
) -> Dispatcher {
    let mut builder = Dispatcher::builder(routes).shared_log_sink(sink);
    builder.writer = writer;
    builder.build()
}

impl Dispatcher {
    pub fn builder(routes: RouteTable) -> DispatcherBuilder {
        DispatcherBuilder {
            routes,
            writer: None,
            sink: None,
            environment: Environment::default(),
            time_format: default_time_format,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Serves one request end to end. Never fails and never panics: every
    /// failure, including a panic inside a handler, becomes a response.
    pub async fn serve_request<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: HttpBody + Send,
        B::Data: Send,
        B::Error: fmt::Display,
    {
        let started = Instant::now();
        let (parts, body) = req.into_parts();
        let query = parts.uri.query().map(str::to_owned);
        let (path, routable) = match percent_decode_str(parts.uri.path()).decode_utf8() {
            Ok(path) => (path.into_owned(), true),
            Err(_) => (parts.uri.path().to_owned(), false),
        };

        let mut details = RouteDetails::new(
            parts.method,
            path,
            parts.headers,
            None,
            parts.extensions,
            LogRecord::new(self.environment, self.time_format),
        );
        details.log.info(format_args!("Incoming Request {} : {}", details.method, details.path));

        let outcome = catch_panic(self.process(&mut details, routable, query.as_deref(), body)).await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(report) => {
                error!(
                    method = %details.method,
                    path = %details.path,
                    file = %report.file,
                    line = report.line,
                    "handler panicked: {}", report.message
                );
                details.log.panic(&report.message, &report.file, report.line, &report.trace);
                Err(ApiError::internal("Unknown server error"))
            }
        };

        let record = details.log.take();
        if let Err(report) = catch_sync(|| self.sink.flush(&record)) {
            error!(file = %report.file, line = report.line, "log sink panicked: {}", report.message);
        }

        let response = self.respond(outcome);
        let status = response.status_code();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if status.is_server_error() {
            warn!(method = %details.method, path = %details.path, status = status.as_u16(), elapsed_ms, "request failed");
        } else {
            info!(method = %details.method, path = %details.path, status = status.as_u16(), elapsed_ms, "request served");
        }
        response.into_inner()
    }

    async fn process<B>(
        &self,
        details: &mut RouteDetails,
        routable: bool,
        query: Option<&str>,
        body: B,
    ) -> Result<Vec<u8>, ApiError>
    where
        B: HttpBody + Send,
        B::Data: Send,
        B::Error: fmt::Display,
    {
        details.body = match read_body(&details.method, query, body).await {
            Ok(body) => body,
            Err(e) => {
                details.log.severe(format_args!("Error:  {e}"));
                return Err(e);
            }
        };

        let handler = if routable { self.routes.lookup(&details.method, &details.path) } else { None };
        let Some(handler) = handler else {
            details.log.severe("Path not found");
            return Err(ApiError::authentication("Path not found").with_message("Path not found"));
        };

        let result = handle_request(&**handler, details).await;
        if let Err(e) = &result {
            details.log.severe(format_args!("Error:  {e}"));
        }
        result
    }

    /// The writer runs after the log is flushed, so a panic in it can only be
    /// reported through `tracing`.
    fn respond(&self, outcome: Result<Vec<u8>, ApiError>) -> Response {
        match catch_sync(|| self.writer.write(outcome)) {
            Ok(response) => response,
            Err(report) => {
                error!(file = %report.file, line = report.line, "response writer panicked: {}", report.message);
                JsonResponseWriter.write(Err(ApiError::internal("response writer panicked")))
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

/// Configures a [`Dispatcher`]. Obtain via [`Dispatcher::builder`].
pub struct DispatcherBuilder {
    routes: RouteTable,
    writer: Option<Box<dyn ResponseWriter>>,
    sink: Option<Arc<dyn LogSink>>,
    environment: Environment,
    time_format: TimeFormat,
}

impl DispatcherBuilder {
    /// Replaces the default JSON writer.
    pub fn response_writer(mut self, writer: impl ResponseWriter) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    /// Where finished request logs go. Defaults to [`TracingSink`].
    pub fn log_sink(self, sink: impl LogSink) -> Self {
        self.shared_log_sink(Arc::new(sink))
    }

    /// Like [`log_sink`](Self::log_sink) for a sink the caller keeps a handle to.
    pub fn shared_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    pub fn build(self) -> Dispatcher {
        install_hook();
        Dispatcher {
            routes: self.routes,
            writer: self.writer.unwrap_or_else(|| Box::new(JsonResponseWriter)),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            environment: self.environment,
            time_format: self.time_format,
        }
    }
}

// ── Body decoding ─────────────────────────────────────────────────────────────

async fn read_body<B>(method: &Method, query: Option<&str>, body: B) -> Result<Option<Body>, ApiError>
where
    B: HttpBody + Send,
    B::Error: fmt::Display,
{
    if *method == Method::GET {
        return Ok(Some(query_body(query.unwrap_or_default())));
    }
    let bytes = body
        .collect()
        .await
        .map_err(|e| ApiError::internal(format!("reading request body: {e}")))?
        .to_bytes();
    json_body(&bytes)
}

/// Every key maps to the JSON array of all its values, in order.
fn query_body(query: &str) -> Body {
    let mut body = Body::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let slot = body.entry(key.into_owned()).or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(values) = slot {
            values.push(Value::String(value.into_owned()));
        }
    }
    body
}

/// Decodes the first JSON value as an object. No value at all, or `null`,
/// means no body; bytes after the first value are ignored.
fn json_body(bytes: &[u8]) -> Result<Option<Body>, ApiError> {
    let mut values = serde_json::Deserializer::from_slice(bytes).into_iter::<Option<Body>>();
    match values.next() {
        None => Ok(None),
        Some(Ok(body)) => Ok(body),
        Some(Err(e)) => Err(ApiError::internal(e.to_string())),
    }
}
