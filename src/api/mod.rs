// Assistant backend API client

pub mod decoder;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub use decoder::{decode_stream, EventStream, StreamEvent};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to send ask request: {0}")]
    Request(#[source] reqwest::Error),
    #[error("API request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("stream read error: {0}")]
    Stream(String),
}

#[derive(Debug, Clone)]
pub struct AskClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
}

impl AskClient {
    pub fn new(base_url: &str, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Post a question and return the decoded answer stream.
    ///
    /// Fails before any event is produced if the request cannot be sent or
    /// the server answers with a non-success status.
    pub async fn ask_stream(&self, question: &str) -> Result<EventStream, ApiError> {
        let url = format!("{}/ask/stream", self.base_url);
        tracing::debug!(%url, "sending question");

        let response = self
            .client
            .post(&url)
            .json(&AskRequest { question })
            .send()
            .await
            .map_err(ApiError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        Ok(decode_stream(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/event-stream")
            .set_body_string(body)
    }

    #[test]
    fn test_client_creation() {
        let client = AskClient::new("http://localhost:8000/", 30);
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_ask_request_serialization() {
        let json = serde_json::to_string(&AskRequest {
            question: "What is ashwagandha?",
        })
        .unwrap();
        assert_eq!(json, r#"{"question":"What is ashwagandha?"}"#);
    }

    #[tokio::test]
    async fn test_ask_stream_posts_question_and_decodes_tokens() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ask/stream"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"question": "What is ashwagandha?"})))
            .respond_with(sse(
                "data: {\"token\":\"Ashwagandha\"}\n\ndata: {\"token\":\" is an herb.\"}\n\n",
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = AskClient::new(&mock_server.uri(), 5).unwrap();
        let stream = client.ask_stream("What is ashwagandha?").await.unwrap();
        let tokens: Vec<StreamEvent> = stream.map(Result::unwrap).collect().await;

        assert_eq!(
            tokens,
            vec![
                StreamEvent::Token("Ashwagandha".to_string()),
                StreamEvent::Token(" is an herb.".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_ask_stream_rejects_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ask/stream"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&mock_server)
            .await;

        let client = AskClient::new(&mock_server.uri(), 5).unwrap();
        let result = client.ask_stream("hello").await;

        match result {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "overloaded");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected status error"),
        }
    }

    #[tokio::test]
    async fn test_ask_stream_connection_refused() {
        // Port 9 (discard) is not expected to be listening.
        let client = AskClient::new("http://127.0.0.1:9", 5).unwrap();
        let result = client.ask_stream("hello").await;
        assert!(matches!(result, Err(ApiError::Request(_))));
    }
}
