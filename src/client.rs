//! Outbound HTTP for handlers that call other services.
//!
//! A thin wrapper over `reqwest`: one shared connection pool, a fixed
//! 15-second timeout, and a choice of how server certificates are trusted.
//! Every call returns the raw body and status, whatever the status is; use
//! [`is_success`](crate::util::is_success) to decide what counts as success.

use std::time::Duration;

use http::{HeaderMap, Method, StatusCode};

/// Applied to every outbound request, connect through last body byte.
pub const TIMEOUT: Duration = Duration::from_secs(15);

/// How the client verifies server certificates.
#[derive(Clone, Debug, Default)]
pub enum TlsTrust {
    /// The bundled web PKI roots.
    #[default]
    System,
    /// Skip verification entirely. Only for talking to test fixtures.
    AcceptInvalid,
    /// Additionally trust the certificates in this PEM bundle.
    CustomCa(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid CA bundle: {0}")]
    InvalidCa(#[source] reqwest::Error),

    #[error("building http client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("{method} {url}: {source}")]
    Request {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Shared outbound client. Clone it freely; clones share the pool.
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(trust: TlsTrust) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().timeout(TIMEOUT);
        builder = match trust {
            TlsTrust::System => builder,
            TlsTrust::AcceptInvalid => builder.danger_accept_invalid_certs(true),
            TlsTrust::CustomCa(pem) => {
                let cert = reqwest::Certificate::from_pem(&pem).map_err(ClientError::InvalidCa)?;
                builder.add_root_certificate(cert)
            }
        };
        let inner = builder.build().map_err(ClientError::Build)?;
        Ok(Self { inner })
    }

    pub async fn get(&self, url: &str, headers: &HeaderMap) -> Result<(Vec<u8>, StatusCode), ClientError> {
        self.send(Method::GET, url, None, headers).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: &HeaderMap,
    ) -> Result<(Vec<u8>, StatusCode), ClientError> {
        self.send(Method::POST, url, Some(body), headers).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: &HeaderMap,
    ) -> Result<(Vec<u8>, StatusCode), ClientError> {
        self.send(Method::PUT, url, Some(body), headers).await
    }

    pub async fn patch(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: &HeaderMap,
    ) -> Result<(Vec<u8>, StatusCode), ClientError> {
        self.send(Method::PATCH, url, Some(body), headers).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        headers: &HeaderMap,
    ) -> Result<(Vec<u8>, StatusCode), ClientError> {
        let fail = |source| ClientError::Request { method: method.clone(), url: url.to_owned(), source };

        let mut req = self.inner.request(method.clone(), url).headers(headers.clone());
        if let Some(body) = body {
            req = req.body(body);
        }
        let res = req.send().await.map_err(fail)?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(fail)?;
        Ok((bytes.to_vec(), status))
    }
}
