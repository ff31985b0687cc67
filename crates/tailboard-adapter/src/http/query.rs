/*
[INPUT]:  Topic name and query clauses
[OUTPUT]: Key listings, matching entries, or inline query errors
[POS]:    HTTP layer - query.cgi index lookups
[UPDATE]: When query endpoint or response shapes change
*/

use crate::http::{Result, TailClient};
use crate::types::{QueryRequest, QueryResponse};
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;

pub const QUERY_ENDPOINT: &str = "cgi-bin/query.cgi";

impl TailClient {
    /// Run an index query
    ///
    /// POST cgi-bin/query.cgi/{topic}
    pub async fn query(&self, topic: &str, request: &QueryRequest) -> Result<QueryResponse> {
        let endpoint = format!("{QUERY_ENDPOINT}/{topic}");
        let body = serde_json::to_string(request)?;
        let builder = self
            .request(Method::POST, &endpoint)?
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .body(body);
        let text = self.send_text(builder).await?;
        Ok(QueryResponse::parse(request.op(), &text)?)
    }
}
