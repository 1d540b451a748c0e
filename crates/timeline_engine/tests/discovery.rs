use timeline_engine::{discover_websocket, FailureKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn resolves_websocket_url_from_version_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"Browser":"Chrome/120.0.0.0","webSocketDebuggerUrl":"ws://127.0.0.1:9222/devtools/browser/abc123"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let ws_url = discover_websocket(&server.uri()).await.expect("discovery ok");
    assert_eq!(ws_url, "ws://127.0.0.1:9222/devtools/browser/abc123");
}

#[tokio::test]
async fn trailing_slash_on_the_endpoint_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"webSocketDebuggerUrl":"ws://127.0.0.1:9222/devtools/browser/def456"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let endpoint = format!("{}/", server.uri());
    let ws_url = discover_websocket(&endpoint).await.expect("discovery ok");
    assert_eq!(ws_url, "ws://127.0.0.1:9222/devtools/browser/def456");
}

#[tokio::test]
async fn missing_debugger_url_is_a_launch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"Browser":"Chrome/120.0.0.0"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let err = discover_websocket(&server.uri()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::BrowserLaunch);
    assert!(err.message.contains("webSocketDebuggerUrl"));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_launch_failure() {
    // Nothing listens on this port.
    let err = discover_websocket("http://127.0.0.1:1").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::BrowserLaunch);
}
