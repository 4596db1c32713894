//! End-to-end over a real socket, using the crate's own outbound client.

#![cfg(feature = "client")]

mod common;

use std::sync::Arc;

use http::{HeaderMap, HeaderValue, Method, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wicket::client::{HttpClient, TlsTrust};
use wicket::util::{basic_auth_header, is_success};
use wicket::{Dispatcher, RouteTable, Server};

use common::{RecordingSink, Script, Scripted, boxed};

#[tokio::test]
async fn test_serves_until_shutdown() {
    let create = Scripted::new(Script::Succeed, r#"{"id":1}"#);
    let explode = Scripted::new(Script::PanicInCall, "{}");
    let sink = Arc::new(RecordingSink::default());
    let routes = RouteTable::new()
        .try_insert(Method::POST, "/widgets", boxed(&create))
        .and_then(|t| t.try_insert(Method::PATCH, "/widgets", boxed(&explode)))
        .unwrap();
    let dispatcher = Dispatcher::builder(routes)
        .shared_log_sink(Arc::clone(&sink) as Arc<dyn wicket::LogSink>)
        .build();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(Server::serve_until(listener, dispatcher, async move {
        let _ = stop_rx.await;
    }));

    let client = HttpClient::new(TlsTrust::System).unwrap();
    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_str(&basic_auth_header("ana", "pw")).unwrap());
    headers.insert("connection", HeaderValue::from_static("close"));

    let (body, status) = client
        .post(&format!("{base}/widgets"), br#"{"name":"x"}"#.to_vec(), &headers)
        .await
        .unwrap();
    assert!(is_success(status));
    assert_eq!(body, br#"{"id":1}"#);

    let (body, status) = client.get(&format!("{base}/unknown"), &headers).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, br#"{"message":"Path not found","status":"error"}"#);

    let (_, status) = client
        .patch(&format!("{base}/widgets"), b"{}".to_vec(), &headers)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // The panic above did not take the server down.
    let (_, status) = client
        .put(&format!("{base}/widgets"), b"not json".to_vec(), &headers)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    drop(client);
    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();

    assert_eq!(sink.flushes().len(), 4);
    assert_eq!(create.counts(), (1, 1, 1));
}
