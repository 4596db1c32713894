//! # wicket
//!
//! A small HTTP dispatch layer for services behind a reverse proxy.
//!
//! Every request enters through one [`Dispatcher`]. It matches the request's
//! exact `(method, path)` against a [`RouteTable`], runs the matched
//! [`RouteHandler`] through a fixed three-stage pipeline, and turns the
//! outcome, or any failure on the way, into a response:
//!
//! - **authenticate** → may attach a user and replace the request context
//! - **validate** → read-only look at method, path, headers and body
//! - **execute** → produces the response bytes
//!
//! The first stage to fail ends the request with that stage's [`ApiError`].
//! A panic anywhere in the pipeline is contained to its own request and
//! answered with a generic 500.
//!
//! While a request runs, the dispatcher and the handler append lines to its
//! [`LogRecord`]. The finished record is flushed to a [`LogSink`] exactly once
//! per request, on every exit path.
//!
//! What the proxy in front already owns (TLS termination, keep-alive tuning,
//! rate limiting, body-size limits) wicket leaves alone.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use http::{Extensions, HeaderMap, Method};
//! use wicket::{ApiError, Authenticated, Dispatcher, RouteDetails, RouteHandler, RouteTable, Server};
//!
//! struct CreateWidget;
//!
//! #[async_trait]
//! impl RouteHandler for CreateWidget {
//!     async fn is_authenticated(&self, _: &Extensions, headers: &HeaderMap) -> Result<Authenticated, ApiError> {
//!         match headers.get("authorization") {
//!             Some(_) => Ok(Authenticated::unchanged()),
//!             None => Err(ApiError::authorization("missing authorization header")),
//!         }
//!     }
//!
//!     async fn is_valid_input(&self, details: &RouteDetails) -> Result<(), ApiError> {
//!         match details.field("name") {
//!             Some(v) if v.is_string() => Ok(()),
//!             _ => Err(ApiError::invalid_input("name must be a string")),
//!         }
//!     }
//!
//!     async fn handle_call(&self, details: &mut RouteDetails) -> Result<Vec<u8>, ApiError> {
//!         details.log().info("widget created");
//!         Ok(br#"{"id":1}"#.to_vec())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wicket::Error> {
//!     let routes = RouteTable::new().on(Method::POST, "/widgets", CreateWidget);
//!     let dispatcher = Dispatcher::builder(routes).build();
//!     Server::bind("0.0.0.0:3000")?.serve(dispatcher).await
//! }
//! ```

mod api_error;
mod config;
mod dispatch;
mod error;
mod handler;
mod log;
mod panic;
mod request;
mod response;
mod router;
mod server;
mod sink;

#[cfg(feature = "client")]
pub mod client;
pub mod util;

pub use api_error::ApiError;
pub use config::{Environment, FileSinkConfig, UnknownEnvironment};
pub use dispatch::{Dispatcher, DispatcherBuilder, register_routes};
pub use error::Error;
pub use handler::{Authenticated, BoxedHandler, RouteHandler, handle_request};
pub use log::{Level, LogRecord, TimeFormat, default_time_format};
pub use request::{Body, RouteDetails, UserInfo};
pub use response::{ContentType, JsonResponseWriter, Response, ResponseBuilder, ResponseWriter};
pub use router::RouteTable;
pub use server::Server;
pub use sink::{FileSink, LogSink, Tenure, TracingSink};
