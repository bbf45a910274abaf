//! Discovery against a real local HTTP listener.

mod common;

use std::time::Duration;

use inspector::{discovery, DiscoveryConfig, InspectorError};

#[tokio::test]
async fn discover_prefers_the_socket_path() {
    let html = r#"<html><body>
        <a href="/Main/7">main frame</a>
        <p>inspectable page at /socket/1/2/Page</p>
    </body></html>"#;
    let (addr, server) = common::http_once(html).await;

    let config = DiscoveryConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        attempts: 3,
        backoff: Duration::from_millis(50),
        fetch_timeout: Duration::from_secs(1),
    };
    let endpoint = discovery::discover(&config).await.unwrap();
    assert_eq!(endpoint.target_path, "/socket/1/2/Page");
    assert_eq!(
        endpoint.ws_url(),
        format!("ws://{}:{}/socket/1/2/Page", addr.ip(), addr.port())
    );
    server.await.unwrap();
}

#[tokio::test]
async fn discover_times_out_when_nothing_listens() {
    // Bind and immediately drop to get a port nothing answers on.
    let free = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = free.local_addr().unwrap();
    drop(free);

    let config = DiscoveryConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        attempts: 2,
        backoff: Duration::from_millis(25),
        fetch_timeout: Duration::from_millis(500),
    };
    let error = discovery::discover(&config).await.unwrap_err();
    match error {
        InspectorError::DiscoveryTimeout { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("expected a discovery timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn reachable_page_without_paths_is_no_target_path() {
    let (addr, server) = common::http_once("<html><body>warming up</body></html>").await;

    let config = DiscoveryConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        attempts: 2,
        backoff: Duration::from_millis(25),
        fetch_timeout: Duration::from_secs(1),
    };
    let error = discovery::discover(&config).await.unwrap_err();
    assert!(
        matches!(error, InspectorError::NoTargetPath),
        "expected NoTargetPath, got {error:?}"
    );
    server.await.unwrap();
}
