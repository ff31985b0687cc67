/*
[INPUT]:  Queue names
[OUTPUT]: Pending queue messages and queue depth summaries
[POS]:    HTTP layer - /fetch queue inspection endpoints
[UPDATE]: When queue endpoint paths or message fields change
*/

use crate::http::{Result, TailClient};
use crate::types::{QueueMessage, QueueSummary};
use reqwest::Method;
use serde::de::DeserializeOwned;

pub const FETCH_ENDPOINT: &str = "fetch";

impl TailClient {
    /// Messages currently held by a queue
    ///
    /// GET fetch/{queue}
    pub async fn fetch_queue(&self, queue: &str) -> Result<Vec<QueueMessage>> {
        self.get_list(&format!("{FETCH_ENDPOINT}/{queue}")).await
    }

    /// All queues with their depth
    ///
    /// GET fetch
    pub async fn list_queues(&self) -> Result<Vec<QueueSummary>> {
        self.get_list(FETCH_ENDPOINT).await
    }

    async fn get_list<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>> {
        let builder = self.request(Method::GET, endpoint)?;
        let body = self.send_text(builder).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::http::TailClient;
    use crate::types::QueueSummary;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_queue() {
        let server = MockServer::start().await;
        let _mock = Mock::given(method("GET"))
            .and(path("/fetch/tasks:queue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "message_stream": "task-9",
                    "message_payload": "echo hi",
                    "message_timestamp": 1700000000,
                    "attempts": 2,
                    "next_attempt": 1700000060
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = TailClient::new(&server.uri()).expect("client init");
        let messages = client.fetch_queue("tasks:queue").await.expect("fetch_queue");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_stream, "task-9");
        assert_eq!(messages[0].attempts, 2);
        assert_eq!(messages[0].next_attempt, 1_700_000_060.0);
    }

    #[tokio::test]
    async fn test_list_queues_and_empty_queue() {
        let server = MockServer::start().await;
        let _list = Mock::given(method("GET"))
            .and(path("/fetch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "tasks:queue", "size": 4}
            ])))
            .mount(&server)
            .await;
        let _empty = Mock::given(method("GET"))
            .and(path("/fetch/idle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = TailClient::new(&server.uri()).expect("client init");

        let queues = client.list_queues().await.expect("list_queues");
        assert_eq!(
            queues,
            vec![QueueSummary {
                name: "tasks:queue".to_string(),
                size: 4
            }]
        );

        let idle = client.fetch_queue("idle").await.expect("fetch_queue");
        assert!(idle.is_empty());
    }
}
