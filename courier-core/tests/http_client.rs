use std::{io::Write, time::Duration};

use courier_core::{Client, ClientConfig, RequestDescriptor, RequestError};
use serde_json::json;

#[tokio::test(flavor = "multi_thread")]
async fn sub_second_client_timeout_lets_fast_requests_through() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/fast")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let cfg = ClientConfig::new(server.url(), Duration::from_millis(1500)).unwrap();
    assert_eq!(cfg.timeout(), Duration::from_millis(1500));

    let client = Client::new(cfg).unwrap();
    let payload = client.dispatch(RequestDescriptor::get("/fast")).await.unwrap();
    assert_eq!(payload, json!({ "ok": true }));
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_response_past_request_deadline_times_out() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/slow")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(800));
            w.write_all(b"{}")
        })
        .create_async()
        .await;

    let client = Client::new(ClientConfig::new(server.url(), Duration::from_secs(30)).unwrap())
        .unwrap();

    let err = client
        .dispatch(RequestDescriptor::get("/slow").timeout(Duration::from_millis(100)))
        .await
        .unwrap_err();

    assert!(!err.is_cancelled());
    assert!(
        matches!(err, RequestError::Timeout { timeout, .. } if timeout == Duration::from_millis(100)),
        "unexpected error: {err:?}"
    );
    assert_eq!(client.in_flight_len(), 0);
}

#[test]
fn client_rejects_zero_timeout_config() {
    let cfg = ClientConfig {
        timeout_ms: 0,
        ..ClientConfig::default()
    };
    assert!(Client::new(cfg).is_err());
}
