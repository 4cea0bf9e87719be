//! HTTP backend for OpenAI-compatible `/v1/completions` servers (vLLM,
//! llama.cpp server, TGI in OpenAI mode).
//!
//! The batch is split into chunks of `chunk_size` prompts, one request per
//! chunk, with at most `max_concurrency` requests in flight. Completions are
//! placed back by their `index` field so output order always matches input
//! order.

use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{BackendError, GenerationBackend, SamplingConfig};

pub struct CompletionsClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    chunk_size: usize,
    max_concurrency: usize,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a [String],
    temperature: f32,
    max_tokens: u32,
    stop: &'a [String],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    index: usize,
    text: String,
}

impl CompletionsClient {
    /// `base_url` should be like `http://localhost:8000` (no trailing slash).
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key: None,
            chunk_size: 64,
            max_concurrency: 8,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete_chunk(
        &self,
        offset: usize,
        prompts: &[String],
        sampling: &SamplingConfig,
    ) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/v1/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            prompt: prompts,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            stop: &sampling.stop,
        };

        debug!(offset, count = prompts.len(), "sending completion request");
        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(BackendError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = resp.json().await?;
        assemble(parsed.choices, prompts.len(), offset)
    }
}

/// Order completions by `index` and check every prompt got exactly one.
fn assemble(
    choices: Vec<CompletionChoice>,
    expected: usize,
    offset: usize,
) -> Result<Vec<String>, BackendError> {
    if choices.len() != expected {
        return Err(BackendError::CountMismatch {
            expected,
            got: choices.len(),
        });
    }

    let mut slots: Vec<Option<String>> = vec![None; expected];
    for choice in choices {
        match slots.get_mut(choice.index) {
            Some(slot) if slot.is_none() => *slot = Some(choice.text),
            _ => return Err(BackendError::MissingCompletion(offset + choice.index)),
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| slot.ok_or(BackendError::MissingCompletion(offset + i)))
        .collect()
}

#[async_trait::async_trait]
impl GenerationBackend for CompletionsClient {
    fn name(&self) -> &str {
        "openai-completions"
    }

    async fn generate(
        &self,
        prompts: &[String],
        sampling: &SamplingConfig,
    ) -> Result<Vec<String>, BackendError> {
        info!(
            url = %self.base_url,
            model = %self.model,
            prompts = prompts.len(),
            chunk_size = self.chunk_size,
            "generating completions"
        );

        let futures: Vec<_> = prompts
            .chunks(self.chunk_size)
            .enumerate()
            .map(|(i, chunk)| self.complete_chunk(i * self.chunk_size, chunk, sampling))
            .collect();
        let chunks: Vec<Vec<String>> = stream::iter(futures)
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let texts: Vec<String> = chunks.into_iter().flatten().collect();
        if texts.len() != prompts.len() {
            return Err(BackendError::CountMismatch {
                expected: prompts.len(),
                got: texts.len(),
            });
        }
        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, read the full request, reply with `response`
    /// verbatim, and close. Returns the base URL.
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + len {
                        break;
                    }
                }
            }
            sock.write_all(response.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}")
    }

    fn choice(index: usize, text: &str) -> CompletionChoice {
        CompletionChoice {
            index,
            text: text.into(),
        }
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = CompletionsClient::new("http://localhost:8000/".into(), "m".into());
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[test]
    fn builder_clamps_zero_sizes() {
        let client = CompletionsClient::new("http://x".into(), "m".into())
            .with_chunk_size(0)
            .with_max_concurrency(0)
            .with_api_key(Some(String::new()));
        assert_eq!(client.chunk_size, 1);
        assert_eq!(client.max_concurrency, 1);
        assert!(client.api_key.is_none());
    }

    #[test]
    fn assemble_reorders_by_index() {
        let out = assemble(vec![choice(2, "c"), choice(0, "a"), choice(1, "b")], 3, 0).unwrap();
        assert_eq!(out, vec!["a", "b", "c"]);
    }

    #[test]
    fn assemble_rejects_wrong_count() {
        let err = assemble(vec![choice(0, "a")], 2, 0).unwrap_err();
        assert!(matches!(err, BackendError::CountMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn assemble_rejects_duplicate_index() {
        let err = assemble(vec![choice(0, "a"), choice(0, "b")], 2, 64).unwrap_err();
        assert!(matches!(err, BackendError::MissingCompletion(64)));
    }

    #[test]
    fn response_json_parses() {
        let json = r#"{
            "id": "cmpl-1",
            "object": "text_completion",
            "model": "meta-llama/Llama-3.1-8B-Instruct",
            "choices": [
                {"index": 1, "text": " the answer is (B).", "finish_reason": "stop", "logprobs": null},
                {"index": 0, "text": " the answer is (A).", "finish_reason": "stop", "logprobs": null}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 12, "total_tokens": 22}
        }"#;
        let parsed: CompletionResponse = serde_json::from_str(json).unwrap();
        let out = assemble(parsed.choices, 2, 0).unwrap();
        assert_eq!(out[0], " the answer is (A).");
    }

    #[tokio::test]
    async fn generate_over_http_keeps_prompt_order() {
        let body = r#"{"choices":[{"index":1,"text":" (B)"},{"index":0,"text":" (A)"}]}"#;
        let url = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ))
        .await;
        let client = CompletionsClient::new(url, "m".into());
        let prompts = vec!["p0".to_string(), "p1".to_string()];
        let out = client
            .generate(&prompts, &SamplingConfig::default())
            .await
            .unwrap();
        assert_eq!(out, vec![" (A)", " (B)"]);
    }

    #[tokio::test]
    async fn unreadable_error_body_keeps_cause() {
        // Declared length exceeds what is sent before the socket closes.
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\nConnection: close\r\n\r\npartial"
                .to_string(),
        )
        .await;
        let client = CompletionsClient::new(url, "m".into());
        let err = client
            .generate(&["p".to_string()], &SamplingConfig::default())
            .await
            .unwrap_err();
        match err {
            BackendError::Server { status, body } => {
                assert_eq!(status, 500);
                assert!(body.starts_with("<unreadable body: "), "{body}");
            }
            other => panic!("expected server error, got {other}"),
        }
    }

    #[tokio::test]
    async fn readable_error_body_is_returned() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 16\r\nConnection: close\r\n\r\nmodel not loaded"
                .to_string(),
        )
        .await;
        let client = CompletionsClient::new(url, "m".into());
        let err = client
            .generate(&["p".to_string()], &SamplingConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::Server { status: 503, ref body } if body == "model not loaded"
        ));
    }

    #[test]
    fn request_json_shape() {
        let prompts = vec!["p1".to_string(), "p2".to_string()];
        let sampling = SamplingConfig::default();
        let body = CompletionRequest {
            model: "m",
            prompt: &prompts,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            stop: &sampling.stop,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["prompt"][1], "p2");
        assert_eq!(value["max_tokens"], 2048);
        assert_eq!(value["stop"][0], "Question:");
    }
}
