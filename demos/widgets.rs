//! Minimal wicket service: one authenticated JSON endpoint.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example widgets
//!
//! Request logs go through `tracing` unless WICKET_LOG_DIR is set, in which
//! case they are appended to a daily file in that directory.
//!
//! Try:
//!   curl -u admin:secret -X POST http://localhost:3000/widgets -d '{"name":"bolt"}'
//!   curl -u admin:secret 'http://localhost:3000/widgets?color=red'
//!   curl -X POST http://localhost:3000/widgets -d '{"name":"bolt"}'      # 401
//!   curl http://localhost:3000/nope                                      # 403

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use http::{Extensions, HeaderMap, Method};
use tracing_subscriber::EnvFilter;
use wicket::util::basic_auth_header;
use wicket::{
    ApiError, Authenticated, Dispatcher, Environment, FileSink, FileSinkConfig, RouteDetails,
    RouteHandler, RouteTable, Server, Tenure, UserInfo,
};

/// Accepts exactly one basic-auth user.
fn check_basic_auth(headers: &HeaderMap) -> Result<Authenticated, ApiError> {
    let expected = basic_auth_header("admin", "secret");
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(given) if given == expected => {
            Ok(Authenticated::unchanged().with_user(UserInfo::new("admin")))
        }
        Some(_) => Err(ApiError::authorization("bad credentials").with_message("invalid credentials")),
        None => Err(ApiError::authorization("no authorization header").with_message("login required")),
    }
}

struct CreateWidget {
    next_id: AtomicU64,
}

#[async_trait]
impl RouteHandler for CreateWidget {
    async fn is_authenticated(&self, _: &Extensions, headers: &HeaderMap) -> Result<Authenticated, ApiError> {
        check_basic_auth(headers)
    }

    async fn is_valid_input(&self, details: &RouteDetails) -> Result<(), ApiError> {
        match details.field("name").and_then(|v| v.as_str()) {
            Some(name) if !name.is_empty() => Ok(()),
            _ => Err(ApiError::invalid_input("name must be a non-empty string")),
        }
    }

    async fn handle_call(&self, details: &mut RouteDetails) -> Result<Vec<u8>, ApiError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = details.field("name").cloned().unwrap_or_default();
        let user = details.user().map(|u| u.username.clone()).unwrap_or_default();
        details.log().log_fields(wicket::Level::Info, "widget created", [("id", id.to_string()), ("by", user)]);
        serde_json::to_vec(&serde_json::json!({ "id": id, "name": name }))
            .map_err(|e| ApiError::internal(e.to_string()))
    }
}

struct ListWidgets;

#[async_trait]
impl RouteHandler for ListWidgets {
    async fn is_authenticated(&self, _: &Extensions, headers: &HeaderMap) -> Result<Authenticated, ApiError> {
        check_basic_auth(headers)
    }

    async fn is_valid_input(&self, _: &RouteDetails) -> Result<(), ApiError> {
        Ok(())
    }

    async fn handle_call(&self, details: &mut RouteDetails) -> Result<Vec<u8>, ApiError> {
        let filter = details.field("color").cloned().unwrap_or_default();
        details.log().debug(format_args!("filter {filter}"));
        Ok(serde_json::json!({ "widgets": [], "filter": filter }).to_string().into_bytes())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let environment: Environment = std::env::var("WICKET_ENV")
        .ok()
        .map(|s| s.parse::<Environment>())
        .transpose()?
        .unwrap_or_default();

    let routes = RouteTable::new()
        .on(Method::POST, "/widgets", CreateWidget { next_id: AtomicU64::new(1) })
        .on(Method::GET,  "/widgets", ListWidgets);

    let mut builder = Dispatcher::builder(routes).environment(environment);
    if let Ok(dir) = std::env::var("WICKET_LOG_DIR") {
        builder = builder.log_sink(FileSink::new(FileSinkConfig {
            dir: dir.into(),
            suffix: "widgets".to_owned(),
            tenure: Tenure::Daily,
        }));
    }

    Server::bind("0.0.0.0:3000")?.serve(builder.build()).await?;
    Ok(())
}
