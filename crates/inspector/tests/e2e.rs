//! Whole-path exercise: bootstrap page fetch, socket upgrade, target
//! handshake, and one evaluate, all against a single scripted peer.

mod common;

use std::time::Duration;

use inspector::{DiscoveryConfig, InspectorSession, SessionConfig};
use serde_json::json;

#[tokio::test]
async fn connects_through_the_bootstrap_page_and_evaluates() {
    let html = r#"<html><body>
        <a href="/socket/1/1/WebPage">Ambience main page</a>
    </body></html>"#;
    let (addr, peer) = common::bootstrap_peer(html, |mut peer| async move {
        common::send_json(&mut peer, common::target_created("p1")).await;
        let expression = common::serve_evaluate(&mut peer, "p1", json!(2)).await;
        assert_eq!(expression, "1+1");
    })
    .await;

    let mut config = SessionConfig::default();
    config.discovery = DiscoveryConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        attempts: 5,
        backoff: Duration::from_millis(50),
        fetch_timeout: Duration::from_secs(1),
    };
    config.announce_window = Duration::from_millis(500);
    config.eval_timeout = Duration::from_secs(2);

    let mut session = InspectorSession::connect(config).await.unwrap();
    assert_eq!(session.target_id(), "p1");

    let value = session.evaluate("1+1").await.unwrap();
    assert_eq!(value, json!(2));
    peer.await.unwrap();
}
