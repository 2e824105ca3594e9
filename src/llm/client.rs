use super::parse;
use super::prompts;
use super::stream::{SseDecoder, SseEvent};
use super::{ChunkSink, EnhancedPrompt, ErrorSink, GenerationError, GenerationService};
use crate::catalog::Category;
use crate::util::truncate;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const BACKOFF_MULTIPLIER: u64 = 2;
const CONNECT_TIMEOUT_SECS: u64 = 15;
const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Everything the client needs from configuration
#[derive(Clone)]
pub struct ClientSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Fixed language for generated prompts; `None` follows the input
    pub output_language: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 60,
            output_language: None,
        }
    }
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("output_language", &self.output_language)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaWrapper,
}

#[derive(Serialize)]
struct JsonSchemaWrapper {
    name: &'static str,
    strict: bool,
    schema: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// OpenRouter error body (can arrive with a 200 status for upstream failures)
#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    code: Option<Value>,
}

impl ApiError {
    fn status(&self) -> Option<u16> {
        match self.code.as_ref()? {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn into_generation_error(self) -> GenerationError {
        classify_provider_error(self.status(), &self.message)
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Redact provider error text that may echo credentials.
fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &["api_key", "apikey", "secret", "bearer", "sk-or-"];

    let truncated = truncate(content, MAX_ERROR_CONTENT_LEN);
    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|p| lower.contains(p)) {
        return "(response details redacted)".to_string();
    }
    truncated
}

fn backoff_secs(retry_count: u32) -> u64 {
    let factor = BACKOFF_MULTIPLIER.pow(retry_count.saturating_sub(1));
    (INITIAL_BACKOFF_MS.saturating_mul(factor) / 1000).max(1)
}

fn parse_retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0 && *secs < 300)
}

fn is_retryable_network_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Classify on the raw provider text, then redact it for display
fn classify_provider_error(status: Option<u16>, raw: &str) -> GenerationError {
    GenerationError::classify(status, raw).map_detail(|detail| sanitize_api_response(&detail))
}

fn error_from_body(status: u16, text: &str) -> GenerationError {
    match serde_json::from_str::<ApiErrorBody>(text) {
        Ok(body) => classify_provider_error(Some(status), &body.error.message),
        Err(_) => classify_provider_error(Some(status), text),
    }
}

/// The model text of a non-streamed completion body
fn completion_content(text: &str) -> Result<String, GenerationError> {
    if let Ok(body) = serde_json::from_str::<ApiErrorBody>(text) {
        return Err(body.error.into_generation_error());
    }
    let response: ChatResponse = serde_json::from_str(text)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedResponse("no choices in response".to_string()))?;

    if let Some(refusal) = choice.message.refusal.filter(|r| !r.trim().is_empty()) {
        return Err(GenerationError::ContentFiltered(refusal));
    }
    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(GenerationError::ContentFiltered(
            "response stopped by content_filter".to_string(),
        ));
    }
    match choice.message.content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(GenerationError::MalformedResponse(
            "empty response content".to_string(),
        )),
    }
}

/// Text fragment carried by one stream payload, if any
fn stream_fragment(payload: &str) -> Result<Option<String>, GenerationError> {
    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
    if let Some(error) = chunk.error {
        return Err(error.into_generation_error());
    }
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };
    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(GenerationError::ContentFiltered(
            "response stopped by content_filter".to_string(),
        ));
    }
    let Some(delta) = choice.delta else {
        return Ok(None);
    };
    if let Some(refusal) = delta.refusal.filter(|r| !r.trim().is_empty()) {
        return Err(GenerationError::ContentFiltered(refusal));
    }
    Ok(delta.content.filter(|c| !c.is_empty()))
}

fn create_http_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))
}

fn create_streaming_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create streaming HTTP client: {}", e))
}

/// Chat-completions client for OpenRouter (or any compatible endpoint)
pub struct OpenRouterClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    settings: ClientSettings,
}

impl OpenRouterClient {
    pub fn new(settings: ClientSettings) -> anyhow::Result<Self> {
        Ok(Self {
            http: create_http_client(settings.timeout_secs)?,
            stream_http: create_streaming_client()?,
            settings,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.settings
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::InvalidCredentials("no API key configured".to_string()))
    }

    /// Send with retry on connect/timeout errors, 429 and 5xx.
    async fn send_with_retry(
        &self,
        http: &reqwest::Client,
        body: &ChatRequest<'_>,
    ) -> Result<reqwest::Response, GenerationError> {
        let api_key = self.api_key()?;
        let mut retry_count = 0;

        loop {
            let sent = http
                .post(self.endpoint())
                .header("Content-Type", "application/json")
                .header("HTTP-Referer", "https://github.com/promptsmith")
                .header("X-Title", "Promptsmith")
                .bearer_auth(api_key)
                .json(body)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(err) => {
                    if is_retryable_network_error(&err) && retry_count < MAX_RETRIES {
                        retry_count += 1;
                        let wait = backoff_secs(retry_count);
                        tracing::debug!("Network error ({}), retry {} in {}s", err, retry_count, wait);
                        tokio::time::sleep(Duration::from_secs(wait)).await;
                        continue;
                    }
                    return Err(GenerationError::from_reqwest(&err));
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let retry_hint = parse_retry_after_header(response.headers());
            let text = response.text().await.unwrap_or_default();
            let retryable = status.as_u16() == 429 || status.is_server_error();
            if retryable && retry_count < MAX_RETRIES {
                retry_count += 1;
                let wait = retry_hint.unwrap_or_else(|| backoff_secs(retry_count));
                tracing::debug!("HTTP {}, retry {} in {}s", status, retry_count, wait);
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }
            return Err(error_from_body(status.as_u16(), &text));
        }
    }

    async fn complete_json(
        &self,
        operation: &'static str,
        system: &str,
        user: &str,
        schema: Value,
        temperature: f32,
    ) -> Result<Value, GenerationError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature: Some(temperature),
            stream: false,
            response_format: Some(ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaWrapper {
                    name: operation,
                    strict: true,
                    schema,
                },
            }),
        };

        tracing::debug!(operation, model = %self.settings.model, "Sending structured request");
        let response = self.send_with_retry(&self.http, &body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::from_reqwest(&e))?;
        let content = completion_content(&text)?;
        let value = parse::parse_json_content(&content)?;
        tracing::debug!(operation, "Structured response parsed");
        Ok(value)
    }

    async fn stream_completion(
        &self,
        prompt: &str,
        on_chunk: &mut ChunkSink,
        cancel: &CancellationToken,
    ) -> Result<(), GenerationError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: None,
            stream: true,
            response_format: None,
        };

        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            sent = self.send_with_retry(&self.stream_http, &body) => sent?,
        };

        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                next = bytes.next() => next,
            };
            let (events, ended) = match next {
                Some(Ok(chunk)) => (decoder.push(&chunk), false),
                Some(Err(err)) => return Err(GenerationError::from_reqwest(&err)),
                None => (decoder.finish(), true),
            };
            for event in events {
                match event {
                    SseEvent::Done => return Ok(()),
                    SseEvent::Data(payload) => {
                        if let Some(fragment) = stream_fragment(&payload)? {
                            if cancel.is_cancelled() {
                                return Ok(());
                            }
                            on_chunk(fragment);
                        }
                    }
                }
            }
            if ended {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl GenerationService for OpenRouterClient {
    async fn select_techniques(
        &self,
        prompt: &str,
        category: Category,
        context: Option<&str>,
    ) -> Result<Vec<String>, GenerationError> {
        let value = self
            .complete_json(
                "technique_selection",
                &prompts::technique_selection_system(),
                &prompts::technique_selection_user(prompt, category, context),
                prompts::technique_schema(),
                prompts::SELECTION_TEMPERATURE,
            )
            .await?;
        parse::techniques_from_value(&value)
    }

    async fn suggest_category(&self, prompt: &str) -> Option<Category> {
        let result = self
            .complete_json(
                "category_suggestion",
                &prompts::category_system(),
                prompt,
                prompts::category_schema(),
                prompts::CATEGORY_TEMPERATURE,
            )
            .await;
        match result {
            Ok(value) => {
                let category = parse::category_from_value(&value);
                if category.is_none() {
                    tracing::warn!("Category suggestion returned no known category: {}", value);
                }
                category
            }
            Err(err) => {
                tracing::warn!("Category suggestion failed: {}", err);
                None
            }
        }
    }

    async fn enhance_prompt(
        &self,
        prompt: &str,
        category: Category,
        techniques: &[String],
    ) -> Result<Vec<EnhancedPrompt>, GenerationError> {
        let value = self
            .complete_json(
                "prompt_enhancement",
                &prompts::enhancement_system(category, self.settings.output_language.as_deref()),
                &prompts::enhancement_user(prompt, techniques),
                prompts::enhancement_schema(),
                prompts::ENHANCE_TEMPERATURE,
            )
            .await?;
        parse::enhanced_from_value(&value)
    }

    async fn execute_prompt_stream(
        &self,
        prompt: &str,
        mut on_chunk: ChunkSink,
        on_error: ErrorSink,
        cancel: CancellationToken,
    ) {
        if let Err(err) = self.stream_completion(prompt, &mut on_chunk, &cancel).await {
            if cancel.is_cancelled() {
                return;
            }
            tracing::warn!("Prompt execution failed: {}", err);
            on_error(err);
        }
    }
}
