//! HTTP client for the puzzle and assistant services
//!
//! One client speaks to both services behind a single base URL. Read-only
//! GETs are retried on transient failures with exponential backoff; the
//! generation and chat POSTs are sent exactly once.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{
    AssistantService, ChatReply, ChatTypesResponse, CluesResponse, DifficultyLevelsResponse, GenerateCluesRequest,
    GenerateLayoutRequest, Layout, ModelsResponse, PuzzleService, ReplyRequest, ServiceError,
};
use crate::config::ServiceConfig;
use crate::domain::Clue;

/// reqwest-backed client for both services
pub struct HttpServiceClient {
    base_url: String,
    http: Client,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl HttpServiceClient {
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        debug!(?config, "from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(ServiceError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout(self.timeout)
        } else {
            ServiceError::Network(e)
        }
    }

    /// Retry budget for `method`; only idempotent reads get one
    fn retries_for(&self, method: &Method) -> u32 {
        if *method == Method::GET { self.max_retries } else { 0 }
    }

    /// Send a request, retrying transient failures of GETs, and decode the JSON body
    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ServiceError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let retries = self.retries_for(&method);
        debug!(%method, %path, retries, "call: called");
        let url = self.url(path);

        let mut attempt = 0;
        loop {
            match self.send_once(method.clone(), &url, body).await {
                Ok(text) => return Ok(serde_json::from_str(&text)?),
                Err(err) if err.is_retryable() && attempt < retries => {
                    attempt += 1;
                    let backoff = self.backoff * 2u32.pow(attempt - 1);
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        %path,
                        error = %err,
                        "call: retrying after transient error"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    debug!(attempt, %path, error = %err, "call: giving up");
                    return Err(err);
                }
            }
        }
    }

    /// One request; the body text of a 2xx response, or the mapped failure
    async fn send_once<B>(&self, method: Method, url: &str, body: Option<&B>) -> Result<String, ServiceError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            debug!(retry_after, "send_once: rate limited (429)");
            return Err(ServiceError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(status, "send_once: API error");
            return Err(ServiceError::ApiError { status, message });
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        debug!(status, len = text.len(), "send_once: success");
        Ok(text)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        self.call::<(), T>(Method::GET, path, None).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ServiceError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.call(Method::POST, path, Some(body)).await
    }
}

#[async_trait]
impl PuzzleService for HttpServiceClient {
    async fn health_check(&self) -> bool {
        debug!(base_url = %self.base_url, "health_check: called");
        match self.http.get(self.url("/health")).send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                debug!(status = %response.status(), healthy, "health_check: probed");
                healthy
            }
            Err(e) => {
                debug!(error = %e, "health_check: probe failed");
                false
            }
        }
    }

    async fn generate_clues(&self, request: GenerateCluesRequest) -> Result<Vec<Clue>, ServiceError> {
        debug!(topic = %request.topic_str, difficulty = %request.difficulty, num_clues = request.num_clues, "generate_clues: called");
        let response: CluesResponse = self.post("/api/clues/generate", &request).await?;
        Ok(response.clues)
    }

    async fn generate_layout(&self, clues: Vec<Clue>) -> Result<Layout, ServiceError> {
        debug!(count = clues.len(), "generate_layout: called");
        self.post("/api/crossword/generate", &GenerateLayoutRequest { clues: &clues })
            .await
    }

    async fn list_models(&self) -> Result<Vec<String>, ServiceError> {
        debug!("list_models: called");
        let response: ModelsResponse = self.get("/api/models").await?;
        Ok(response.models)
    }

    async fn list_difficulties(&self) -> Result<Vec<String>, ServiceError> {
        debug!("list_difficulties: called");
        let response: DifficultyLevelsResponse = self.get("/api/difficulty-levels").await?;
        Ok(response.difficulty_levels)
    }
}

#[async_trait]
impl AssistantService for HttpServiceClient {
    async fn reply(&self, request: ReplyRequest) -> Result<String, ServiceError> {
        debug!(chat_type = %request.chat_type, history = request.historical_messages.len(), "reply: called");
        let response: ChatReply = self.post("/api/chat/generate", &request).await?;
        Ok(response.response)
    }

    async fn list_chat_types(&self) -> Result<Vec<String>, ServiceError> {
        debug!("list_chat_types: called");
        let response: ChatTypesResponse = self.get("/api/chat-types").await?;
        Ok(response.chat_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;
    use crate::session::ChatTurn;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, max_retries: u32) -> HttpServiceClient {
        HttpServiceClient::from_config(&ServiceConfig {
            base_url: format!("{}/", server.base_url()),
            timeout_ms: 2000,
            max_retries,
            retry_backoff_ms: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpServiceClient::from_config(&ServiceConfig {
            base_url: "http://localhost:8000///".to_string(),
            ..ServiceConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/health"), "http://localhost:8000/health");
    }

    #[test]
    fn test_only_gets_are_retried() {
        let client = HttpServiceClient::from_config(&ServiceConfig::default()).unwrap();
        assert_eq!(client.retries_for(&reqwest::Method::GET), 2);
        assert_eq!(client.retries_for(&reqwest::Method::POST), 0);
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(200).json_body(json!({"status": "ok"}));
            })
            .await;

        assert!(client_for(&server, 0).health_check().await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let client = HttpServiceClient::from_config(&ServiceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
            max_retries: 0,
            retry_backoff_ms: 1,
        })
        .unwrap();
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn test_generate_clues_posts_wire_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/clues/generate").json_body(json!({
                    "topic_str": "Roman History",
                    "difficulty": "Easy",
                    "num_clues": 30,
                    "model": "claude-3-5-haiku-20241022",
                }));
                then.status(200)
                    .json_body(json!({"clues": [{"clue": "First emperor", "answer": "AUGUSTUS"}]}));
            })
            .await;

        let clues = client_for(&server, 0)
            .generate_clues(GenerateCluesRequest {
                topic_str: "Roman History".to_string(),
                difficulty: Difficulty::Easy,
                num_clues: 30,
                model: "claude-3-5-haiku-20241022".to_string(),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(clues, vec![Clue::new("First emperor", "AUGUSTUS")]);
    }

    #[tokio::test]
    async fn test_retries_transient_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/models");
                then.status(503).body("busy");
            })
            .await;

        let err = client_for(&server, 2).list_models().await.unwrap_err();
        mock.assert_calls_async(3).await;
        assert!(matches!(err, ServiceError::ApiError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/crossword/generate");
                then.status(422).body("no words fit");
            })
            .await;

        let err = client_for(&server, 2)
            .generate_layout(vec![Clue::new("Feline", "CAT")])
            .await
            .unwrap_err();
        mock.assert_calls_async(1).await;
        assert!(matches!(err, ServiceError::ApiError { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_chat_post_sent_once_on_server_error() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat/generate");
                then.status(500).body("upstream failed");
            })
            .await;

        let err = client_for(&server, 2)
            .reply(ReplyRequest {
                user_input: "Is it a dog?".to_string(),
                clue: Some(Clue::new("Feline", "CAT")),
                chat_type: "Get a Hint".to_string(),
                historical_messages: Vec::new(),
                model: "claude-sonnet-4-20250514".to_string(),
            })
            .await
            .unwrap_err();
        mock.assert_calls_async(1).await;
        assert!(matches!(err, ServiceError::ApiError { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_generation_post_sent_once_on_timeout_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/clues/generate");
                then.status(408);
            })
            .await;

        let err = client_for(&server, 2)
            .generate_clues(GenerateCluesRequest {
                topic_str: "Botany".to_string(),
                difficulty: Difficulty::Hard,
                num_clues: 5,
                model: "claude-3-5-haiku-20241022".to_string(),
            })
            .await
            .unwrap_err();
        mock.assert_calls_async(1).await;
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limit_reports_retry_after() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/chat-types");
                then.status(429).header("retry-after", "12");
            })
            .await;

        let err = client_for(&server, 2).list_chat_types().await.unwrap_err();
        mock.assert_calls_async(1).await;
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
    }

    #[tokio::test]
    async fn test_reply_sends_history_and_null_clue() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat/generate").json_body(json!({
                    "user_input": "Who was Cicero?",
                    "clue": null,
                    "chat_type": "Deep Dive into the Answer",
                    "historical_messages": [
                        {"role": "user", "content": "Hi"},
                        {"role": "assistant", "content": "Hello"}
                    ],
                    "model": "claude-sonnet-4-20250514",
                }));
                then.status(200).json_body(json!({"response": "A Roman orator."}));
            })
            .await;

        let reply = client_for(&server, 0)
            .reply(ReplyRequest {
                user_input: "Who was Cicero?".to_string(),
                clue: None,
                chat_type: "Deep Dive into the Answer".to_string(),
                historical_messages: vec![ChatTurn::user("Hi"), ChatTurn::assistant("Hello")],
                model: "claude-sonnet-4-20250514".to_string(),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "A Roman orator.");
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/difficulty-levels");
                then.status(200).body("not json");
            })
            .await;

        let err = client_for(&server, 0).list_difficulties().await.unwrap_err();
        assert!(matches!(err, ServiceError::Json(_)));
    }
}
