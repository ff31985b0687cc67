/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for tailboard-adapter tests

use serde_json::{Value, json};
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Envelope body with task entries `k{first}..k{first+count}` and a continuation URL
pub fn task_envelope(first: u32, count: u32, next_url: Option<&str>) -> Value {
    let payload = (first..first + count)
        .map(|n| {
            json!({
                "timestamp": 1_700_000_000 + n,
                "type": "TASK_BEGIN",
                "key": format!("k{n}"),
                "value": format!("v{n}")
            })
        })
        .collect::<Vec<_>>();
    match next_url {
        Some(next_url) => json!({"payload": payload, "next_url": next_url}),
        None => json!({"payload": payload}),
    }
}
