//! Shared fixtures for the dispatcher and server tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Request};
use http_body_util::{BodyExt, Full};
use serde_json::Value;
use wicket::{ApiError, Authenticated, LogSink, RouteDetails, RouteHandler, UserInfo};

/// Keeps every flushed record so tests can count and inspect them.
#[derive(Default)]
pub struct RecordingSink {
    flushes: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn flushes(&self) -> Vec<String> {
        self.flushes.lock().unwrap().clone()
    }

    pub fn only_flush(&self) -> String {
        let flushes = self.flushes();
        assert_eq!(flushes.len(), 1, "expected exactly one flush, got {flushes:?}");
        flushes.into_iter().next().unwrap()
    }
}

impl LogSink for RecordingSink {
    fn flush(&self, log: &str) {
        self.flushes.lock().unwrap().push(log.to_owned());
    }
}

/// Which stage a [`Scripted`] handler fails or panics in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Script {
    Succeed,
    RejectAuth,
    RejectInput,
    FailCall,
    PanicInAuth,
    PanicInCall,
}

/// A handler whose behaviour is chosen per test, counting stage invocations.
pub struct Scripted {
    script: Script,
    response: &'static str,
    pub auth_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    pub handle_calls: AtomicUsize,
    /// Body seen by the last `handle_call`.
    pub last_body: Mutex<Option<Value>>,
}

/// Request-scoped value put into the context by a successful authentication.
#[derive(Clone, Debug)]
pub struct Claims {
    pub subject: String,
}

impl Scripted {
    pub fn new(script: Script, response: &'static str) -> Arc<Self> {
        Arc::new(Self {
            script,
            response,
            auth_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            handle_calls: AtomicUsize::new(0),
            last_body: Mutex::new(None),
        })
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.auth_calls.load(Ordering::SeqCst),
            self.validate_calls.load(Ordering::SeqCst),
            self.handle_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl RouteHandler for Scripted {
    async fn is_authenticated(
        &self,
        _context: &Extensions,
        headers: &HeaderMap,
    ) -> Result<Authenticated, ApiError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::RejectAuth => Err(ApiError::authorization("token signature mismatch")
                .with_message("invalid token")),
            Script::PanicInAuth => panic!("auth backend exploded"),
            _ => {
                let subject = headers
                    .get("x-user")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("anonymous")
                    .to_owned();
                let mut context = Extensions::new();
                context.insert(Claims { subject: subject.clone() });
                Ok(Authenticated::unchanged()
                    .with_context(context)
                    .with_user(UserInfo::new(subject)))
            }
        }
    }

    async fn is_valid_input(&self, _details: &RouteDetails) -> Result<(), ApiError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::RejectInput => Err(ApiError::invalid_input("name is required")),
            _ => Ok(()),
        }
    }

    async fn handle_call(&self, details: &mut RouteDetails) -> Result<Vec<u8>, ApiError> {
        self.handle_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_body.lock().unwrap() = details.body().cloned().map(Value::Object);
        let subject = details.context().get::<Claims>().map(|c| c.subject.clone());
        details.log().info(format_args!("handling for {}", subject.as_deref().unwrap_or("?")));
        match self.script {
            Script::FailCall => Err(ApiError::internal("widget store timed out")),
            Script::PanicInCall => {
                tokio::task::yield_now().await;
                panic!("widget store returned garbage");
            }
            _ => Ok(self.response.as_bytes().to_vec()),
        }
    }
}

pub fn request(method: Method, uri: &str, body: &'static str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

pub async fn body_of(res: http::Response<Full<Bytes>>) -> (http::StatusCode, Vec<u8>) {
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

/// A shared handle to a scripted handler, ready for `RouteTable::try_insert`.
pub fn boxed(handler: &Arc<Scripted>) -> wicket::BoxedHandler {
    Arc::clone(handler) as wicket::BoxedHandler
}
