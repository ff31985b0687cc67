/*
[INPUT]:  Topic names, stream offsets, and server-supplied continuation URLs
[OUTPUT]: Envelopes of log entries from the tailing endpoints
[POS]:    HTTP layer - tail.cgi / topic.cgi streaming reads
[UPDATE]: When tail endpoint paths or envelope handling change
*/

use crate::http::{Result, TailClient};
use crate::types::{Envelope, Offset};
use reqwest::Method;
use tracing::debug;

pub const TAIL_ENDPOINT: &str = "cgi-bin/tail.cgi";
pub const TOPIC_ENDPOINT: &str = "cgi-bin/topic.cgi";

/// Path of a `tail.cgi` read: `cgi-bin/tail.cgi/<topic>/<offset>/<count>[/1]`
pub fn tail_path(topic: &str, offset: Offset, count: u32, double_encode: bool) -> String {
    let mut path = format!("{TAIL_ENDPOINT}/{topic}/{offset}/{count}");
    if double_encode {
        path.push_str("/1");
    }
    path
}

/// Path of a partitioned `topic.cgi` read: `cgi-bin/topic.cgi/<topic>/<partition>/<offset>/<count>`
pub fn topic_path(topic: &str, partition: u32, offset: Offset, count: u32) -> String {
    format!("{TOPIC_ENDPOINT}/{topic}/{partition}/{offset}/{count}")
}

impl TailClient {
    /// Fetch one envelope
    ///
    /// GET {path}
    /// An empty body on success is an empty envelope.
    pub async fn fetch_envelope(&self, path: &str) -> Result<Envelope> {
        let builder = self.request(Method::GET, path)?;
        let body = self.send_text(builder).await?;
        if body.trim().is_empty() {
            return Ok(Envelope::default());
        }
        let envelope: Envelope = serde_json::from_str(&body)?;
        debug!(
            path,
            entries = envelope.payload.len(),
            next_url = envelope.next_url.as_deref().unwrap_or(""),
            "fetched envelope"
        );
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ClientConfig, TailboardError};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn tail_paths_follow_endpoint_layout() {
        assert_eq!(
            tail_path("event_log", Offset::Last, 100, false),
            "cgi-bin/tail.cgi/event_log/last/100"
        );
        assert_eq!(
            tail_path("metrics", Offset::At(12), 50, true),
            "cgi-bin/tail.cgi/metrics/12/50/1"
        );
        assert_eq!(
            topic_path("logs", 3, Offset::Recent, 20),
            "cgi-bin/topic.cgi/logs/3/recent/20"
        );
    }

    #[tokio::test]
    async fn test_fetch_envelope() {
        let server = MockServer::start().await;
        let mock_response = r#"{
            "payload": [
                {"timestamp": 1000, "type": "TASK_BEGIN", "key": "k1", "value": "v1"}
            ],
            "next_url": "cgi-bin/tail.cgi/tasks/1/100"
        }"#;

        let _mock = Mock::given(method("GET"))
            .and(path("/cgi-bin/tail.cgi/tasks/last/100"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_raw(mock_response, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client =
            TailClient::with_config(ClientConfig::default(), &server.uri()).expect("client init");

        let envelope = client
            .fetch_envelope(&tail_path("tasks", Offset::Last, 100, false))
            .await
            .expect("fetch_envelope failed");

        assert_eq!(envelope.next_url.as_deref(), Some("cgi-bin/tail.cgi/tasks/1/100"));
        let entries = envelope.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "k1");
        assert_eq!(entries[0].value, "v1");
    }

    #[tokio::test]
    async fn test_fetch_envelope_empty_body() {
        let server = MockServer::start().await;
        let _mock = Mock::given(method("GET"))
            .and(path("/cgi-bin/tail.cgi/quiet/last/10"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = TailClient::new(&server.uri()).expect("client init");
        let envelope = client
            .fetch_envelope("cgi-bin/tail.cgi/quiet/last/10")
            .await
            .expect("empty body is not an error");

        assert_eq!(envelope, Envelope::default());
    }

    #[tokio::test]
    async fn test_fetch_envelope_status_error() {
        let server = MockServer::start().await;
        let _mock = Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let client = TailClient::new(&server.uri()).expect("client init");
        let err = client
            .fetch_envelope("cgi-bin/tail.cgi/any/last/10")
            .await
            .expect_err("503 must fail");

        match err {
            TailboardError::Api { code, message } => {
                assert_eq!(code, 503);
                assert_eq!(message, "busy");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
