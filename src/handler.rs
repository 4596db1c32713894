//! The three-stage handler contract.
//!
//! Every route is served by a [`RouteHandler`]. The dispatcher drives it
//! through a fixed pipeline and stops at the first stage that fails:
//!
//! ```text
//! is_authenticated(context, headers) ── Err ─→ response
//!        │ Ok(Authenticated)  (may replace context, may set user)
//!        ↓
//! is_valid_input(&details)           ── Err ─→ response
//!        │ Ok(())
//!        ↓
//! handle_call(&mut details)          ── Ok(bytes) / Err ─→ response
//! ```
//!
//! One handler instance serves every request on its route, concurrently. It
//! is stored as `Arc<dyn RouteHandler>` and must not keep per-request state.

use std::sync::Arc;

use async_trait::async_trait;
use http::{Extensions, HeaderMap};

use crate::api_error::ApiError;
use crate::request::{RouteDetails, UserInfo};

/// What a successful authentication stage hands back.
#[derive(Debug, Default)]
pub struct Authenticated {
    /// Replaces the request context for the remaining stages when set.
    pub context: Option<Extensions>,
    /// Fills [`RouteDetails::user`] when set.
    pub user: Option<UserInfo>,
}

impl Authenticated {
    /// Authentication passed and nothing about the request changes.
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: Extensions) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_user(mut self, user: UserInfo) -> Self {
        self.user = Some(user);
        self
    }
}

/// Business logic bound to one `(method, path)` route.
#[async_trait]
pub trait RouteHandler: Send + Sync + 'static {
    /// Checks credentials. Fail with [`ApiError::Authentication`] or
    /// [`ApiError::Authorization`].
    async fn is_authenticated(
        &self,
        context: &Extensions,
        headers: &HeaderMap,
    ) -> Result<Authenticated, ApiError>;

    /// Checks the shape of the request. Fail with [`ApiError::InvalidInput`].
    async fn is_valid_input(&self, details: &RouteDetails) -> Result<(), ApiError>;

    /// Does the work and returns the response payload.
    async fn handle_call(&self, details: &mut RouteDetails) -> Result<Vec<u8>, ApiError>;
}

/// A handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn RouteHandler>;

/// Runs `handler`'s three stages against `details`, short-circuiting on the
/// first error.
pub async fn handle_request(
    handler: &dyn RouteHandler,
    details: &mut RouteDetails,
) -> Result<Vec<u8>, ApiError> {
    let auth = handler.is_authenticated(&details.context, &details.headers).await?;
    if let Some(context) = auth.context {
        details.context = context;
    }
    if let Some(user) = auth.user {
        details.user = Some(user);
    }

    handler.is_valid_input(details).await?;

    handler.handle_call(details).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::Method;

    use super::*;
    use crate::config::Environment;
    use crate::log::{LogRecord, default_time_format};

    #[derive(Clone, Copy)]
    enum FailAt {
        Nowhere,
        Auth,
        Validate,
    }

    #[derive(Clone, Debug)]
    struct Tenant(&'static str);

    struct Scripted {
        fail_at: FailAt,
        validated: AtomicUsize,
        called: AtomicUsize,
    }

    impl Scripted {
        fn new(fail_at: FailAt) -> Self {
            Self { fail_at, validated: AtomicUsize::new(0), called: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl RouteHandler for Scripted {
        async fn is_authenticated(
            &self,
            _context: &Extensions,
            _headers: &HeaderMap,
        ) -> Result<Authenticated, ApiError> {
            if let FailAt::Auth = self.fail_at {
                return Err(ApiError::authorization("no token"));
            }
            let mut context = Extensions::new();
            context.insert(Tenant("acme"));
            Ok(Authenticated::unchanged()
                .with_context(context)
                .with_user(UserInfo::new("ana")))
        }

        async fn is_valid_input(&self, details: &RouteDetails) -> Result<(), ApiError> {
            self.validated.fetch_add(1, Ordering::SeqCst);
            assert_eq!(details.user().map(|u| u.username.as_str()), Some("ana"));
            assert!(details.context().get::<Tenant>().is_some());
            if let FailAt::Validate = self.fail_at {
                return Err(ApiError::invalid_input("name missing"));
            }
            Ok(())
        }

        async fn handle_call(&self, details: &mut RouteDetails) -> Result<Vec<u8>, ApiError> {
            self.called.fetch_add(1, Ordering::SeqCst);
            let tenant = details.context().get::<Tenant>().map(|t| t.0).unwrap_or("none");
            Ok(format!(r#"{{"tenant":"{tenant}"}}"#).into_bytes())
        }
    }

    fn details() -> RouteDetails {
        RouteDetails::new(
            Method::GET,
            "/t",
            HeaderMap::new(),
            None,
            Extensions::new(),
            LogRecord::new(Environment::Testing, default_time_format),
        )
    }

    #[tokio::test]
    async fn test_all_stages_run_in_order() {
        let handler = Scripted::new(FailAt::Nowhere);
        let mut details = details();
        let body = handle_request(&handler, &mut details).await.unwrap();
        assert_eq!(body, br#"{"tenant":"acme"}"#.to_vec());
        assert_eq!(details.user(), Some(&UserInfo::new("ana")));
    }

    #[tokio::test]
    async fn test_auth_failure_skips_later_stages() {
        let handler = Scripted::new(FailAt::Auth);
        let err = handle_request(&handler, &mut details()).await.unwrap_err();
        assert_eq!(err, ApiError::authorization("no token"));
        assert_eq!(handler.validated.load(Ordering::SeqCst), 0);
        assert_eq!(handler.called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_call() {
        let handler = Scripted::new(FailAt::Validate);
        let err = handle_request(&handler, &mut details()).await.unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(handler.validated.load(Ordering::SeqCst), 1);
        assert_eq!(handler.called.load(Ordering::SeqCst), 0);
    }
}
