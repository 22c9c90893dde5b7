use async_trait::async_trait;
use parley_core::{GenerationClient, GenerationError};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

use crate::retry::{RetryPolicy, retry_with_backoff};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// A failed request, split by whether sending it again can help.
#[derive(Debug, Error)]
enum RequestError {
    /// Network failures, rate limiting and server-side errors
    #[error("{0:#}")]
    Transient(anyhow::Error),
    /// Rejected requests and unusable responses
    #[error("{0:#}")]
    Permanent(anyhow::Error),
}

impl RequestError {
    const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    fn into_inner(self) -> anyhow::Error {
        match self {
            Self::Transient(e) | Self::Permanent(e) => e,
        }
    }
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        info!("Creating GeminiProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Helper method to send a single request
    async fn try_send(&self, request: &Value) -> Result<String, RequestError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    RequestError::Permanent(e.into())
                } else {
                    RequestError::Transient(e.into())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RequestError::Transient(e.into()))?;

        if !status.is_success() {
            let err = anyhow::anyhow!("Gemini API error ({status}): {}", error_message(&text));
            return Err(if is_transient_status(status) {
                RequestError::Transient(err)
            } else {
                RequestError::Permanent(err)
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            RequestError::Permanent(anyhow::anyhow!("Invalid response body: {e}"))
        })?;

        extract_reply(&body).map_err(RequestError::Permanent)
    }
}

/// Rate limiting, request timeouts and server-side failures.
fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429) || status.is_server_error()
}

/// `error.message` from a JSON error body, or the raw body otherwise.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let raw = body.trim();
            if raw.is_empty() {
                "no error message in response".to_string()
            } else {
                raw.to_string()
            }
        })
}

/// Pull the generated text out of a `generateContent` response body.
fn extract_reply(body: &Value) -> anyhow::Result<String> {
    if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
        anyhow::bail!("Prompt was blocked: {reason}");
    }

    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing content parts"))?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();

    if text.trim().is_empty() {
        anyhow::bail!("Empty response from Gemini");
    }

    Ok(text)
}

#[async_trait]
impl GenerationClient for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ]
        });

        info!("Sending request to Gemini API: model={}", self.model);
        debug!("Prompt length: {} chars", prompt.len());

        let reply = retry_with_backoff(
            || self.try_send(&request),
            &self.retry,
            RequestError::is_transient,
        )
        .await
        .map_err(|e| GenerationError::from(e.into_inner()))?;

        info!("Received response from Gemini API");
        Ok(reply)
    }

    fn display_name(&self) -> &'static str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const REPLY_BODY: &str = r#"{"candidates":[{"content":{"parts":[{"text":"Hi there"}]}}]}"#;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            base_delays: vec![Duration::from_millis(1); 3],
            final_retries: 1,
            final_delay: Duration::from_millis(1),
        }
    }

    /// Consume one HTTP request: headers plus a `Content-Length` body.
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let Ok(n) = stream.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        line.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Answer every connection with the same response; returns the base URL
    /// and a request counter.
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn serve(
        status_line: &'static str,
        content_type: &'static str,
        body: &'static str,
    ) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind local server");
        let addr = listener
            .local_addr()
            .expect("Failed to read local server address");
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                read_request(&mut stream).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                if stream.write_all(response.as_bytes()).await.is_ok() {
                    stream.shutdown().await.ok();
                }
            }
        });

        (format!("http://{addr}/v1beta"), requests)
    }

    fn provider(base_url: String, retry: RetryPolicy) -> GeminiProvider {
        GeminiProvider::new("test-key".to_string())
            .with_base_url(base_url)
            .with_retry_policy(retry)
    }

    #[tokio::test]
    async fn test_generate_returns_reply() {
        let (url, requests) = serve("200 OK", "application/json", REPLY_BODY).await;

        let reply = provider(url, fast_policy()).generate("Hello").await;

        assert_eq!(reply, Ok("Hi there".to_string()));
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_error_is_attempted_once() {
        let (url, requests) = serve(
            "400 Bad Request",
            "application/json",
            r#"{"error":{"message":"API key not valid"}}"#,
        )
        .await;

        let err = provider(url, fast_policy()).generate("Hello").await.err();

        assert_eq!(
            err.map(|e| e.message),
            Some("Gemini API error (400 Bad Request): API key not valid".to_string())
        );
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_json_error_page_keeps_status() {
        let (url, requests) = serve(
            "503 Service Unavailable",
            "text/html",
            "<html>overloaded</html>",
        )
        .await;

        let err = provider(url, RetryPolicy::none()).generate("Hello").await.err();

        assert_eq!(
            err.map(|e| e.message),
            Some("Gemini API error (503 Service Unavailable): <html>overloaded</html>".to_string())
        );
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let (url, requests) = serve(
            "503 Service Unavailable",
            "application/json",
            r#"{"error":{"message":"overloaded"}}"#,
        )
        .await;

        let result = provider(url, fast_policy()).generate("Hello").await;

        assert!(result.is_err());
        assert_eq!(requests.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_attempted_once() {
        let (url, requests) = serve(
            "200 OK",
            "application/json",
            r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#,
        )
        .await;

        let err = provider(url, fast_policy()).generate("Hello").await.err();

        assert_eq!(
            err.map(|e| e.message),
            Some("Prompt was blocked: SAFETY".to_string())
        );
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::REQUEST_TIMEOUT));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
        assert!(!is_transient_status(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(
            error_message(r#"{"error":{"message":"quota exceeded"}}"#),
            "quota exceeded"
        );
        assert_eq!(error_message("  Bad gateway\n"), "Bad gateway");
        assert_eq!(error_message(""), "no error message in response");
    }

    #[test]
    fn test_extract_reply_joins_parts() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "Hi " }, { "text": "there" } ] } }
            ]
        });
        assert_eq!(extract_reply(&body).ok().as_deref(), Some("Hi there"));
    }

    #[test]
    fn test_extract_reply_reports_block_reason() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = extract_reply(&body).err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("Prompt was blocked: SAFETY"));
    }

    #[test]
    fn test_extract_reply_rejects_missing_candidates() {
        let body = json!({ "candidates": [] });
        assert!(extract_reply(&body).is_err());
    }

    #[test]
    fn test_extract_reply_rejects_blank_text() {
        let body = json!({
            "candidates": [ { "content": { "parts": [ { "text": "  " } ] } } ]
        });
        assert!(extract_reply(&body).is_err());
    }

    #[test]
    fn test_endpoint_uses_model_and_trims_base_url() {
        let provider = GeminiProvider::new("key".to_string())
            .with_base_url("http://localhost:8080/v1beta/".to_string())
            .with_model("gemini-pro".to_string());
        assert_eq!(
            provider.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-pro:generateContent"
        );
    }
}
