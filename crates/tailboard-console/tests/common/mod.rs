/*
[INPUT]:  Mock server requirements of the view tests
[OUTPUT]: Mock server setup, envelope fixtures, and frame waiting helpers
[POS]:    Test infrastructure - shared across console integration tests
[UPDATE]: When adding new test patterns or fixtures
*/

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tailboard_console::{FrameReceiver, TableFrame};
use wiremock::MockServer;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Envelope whose payload holds one entry per `(type, key)` pair
pub fn envelope(entries: &[(&str, &str)], next_url: &str) -> Value {
    let payload = entries
        .iter()
        .enumerate()
        .map(|(n, (kind, key))| {
            json!({
                "timestamp": 1_700_000_000 + n as u64,
                "type": kind,
                "key": key,
                "value": format!("value of {key}")
            })
        })
        .collect::<Vec<_>>();
    json!({"payload": payload, "next_url": next_url})
}

/// Wait until the latest frame satisfies `accept`
pub async fn wait_for_frame(
    frames: &mut FrameReceiver,
    accept: impl Fn(&TableFrame) -> bool,
) -> Arc<TableFrame> {
    let waited = tokio::time::timeout(FRAME_TIMEOUT, async {
        loop {
            let current = frames.borrow_and_update().clone();
            if let Some(frame) = current
                && accept(&frame)
            {
                return frame;
            }
            frames.changed().await.expect("view dropped its frame sender");
        }
    })
    .await;
    waited.expect("timed out waiting for frame")
}

pub fn keys(frame: &TableFrame) -> Vec<String> {
    frame
        .rows
        .iter()
        .map(|row| row.key.plain().to_string())
        .collect()
}
