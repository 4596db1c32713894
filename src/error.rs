//! Infrastructure error type.

use http::Method;

/// The error type returned by wicket's fallible setup and serving operations.
///
/// Request-level failures (bad credentials, bad input, missing routes) are
/// expressed as [`ApiError`](crate::ApiError) values and turned into HTTP
/// responses. This type surfaces the failures that happen around requests:
/// binding to a port, accepting a connection, misconfigured route tables.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("duplicate route {method} {path}")]
    DuplicateRoute { method: Method, path: String },
}
