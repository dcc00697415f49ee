use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::{
    format::{signed, thousands},
    models::{MarketSummary, ThresholdKind},
    templates::{Hbs, PROMPT_ALERT},
};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f64 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const SYSTEM_PROMPT: &str = "당신은 주식 시장 분석가입니다. 객관적이고 간결하게 답변하세요.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected: {0}")]
    Unexpected(String),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimit(_) | LlmError::Transport(_) | LlmError::Status { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub total_tokens: u64,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion, LlmError>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            model,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

/// Only 401 is terminal. Everything else non-2xx is retried.
pub fn classify_status(status: StatusCode, body: String) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED => LlmError::Auth(body),
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimit(body),
        _ => LlmError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion, LlmError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let res = self
            .http
            .post(OPENAI_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let parsed = res
            .json::<ChatResponse>()
            .await
            .map_err(|e| LlmError::Unexpected(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::Unexpected("empty completion".to_string()))?;

        Ok(Completion {
            content,
            total_tokens: parsed.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}

/// Bounded exponential backoff: `base_delay * 2^attempt` before the next try.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

pub struct CommentaryRequest<'a> {
    pub stock_name: &'a str,
    pub stock_code: &'a str,
    pub change_rate: f64,
    pub kind: ThresholdKind,
    pub market: &'a MarketSummary,
}

pub fn fallback_comment(stock_name: &str, change_rate: f64, kind: ThresholdKind) -> String {
    let direction = kind.label();
    format!(
        "{stock_name}이(가) 등록가 대비 {:.2}% {direction}하여 설정하신 {direction} 기준에 도달했습니다.",
        change_rate.abs()
    )
}

pub fn render_prompt(hbs: &Hbs, req: &CommentaryRequest<'_>) -> Result<String, handlebars::RenderError> {
    let m = req.market;
    let ctx = json!({
        "stock_name": req.stock_name,
        "stock_code": req.stock_code,
        "change_rate": signed(req.change_rate, 2),
        "threshold_direction": req.kind.label(),
        "kospi": thousands(m.kospi, 2),
        "kosdaq": thousands(m.kosdaq, 2),
        "kospi_change": signed(m.kospi_change, 2),
        "kosdaq_change": signed(m.kosdaq_change, 2),
        "kospi_change_rate": signed(m.kospi_change_rate, 2),
        "kosdaq_change_rate": signed(m.kosdaq_change_rate, 2),
    });
    hbs.render(PROMPT_ALERT, &ctx)
}

/// Writes the short market commentary that goes into an alert mail.
#[derive(Clone)]
pub struct CommentaryGenerator {
    hbs: Hbs,
    backend: Option<Arc<dyn CompletionBackend>>,
    retry: RetryPolicy,
}

impl CommentaryGenerator {
    /// `backend` is `None` when no API key is configured.
    pub fn new(hbs: Hbs, backend: Option<Arc<dyn CompletionBackend>>, retry: RetryPolicy) -> Self {
        Self { hbs, backend, retry }
    }

    /// `None` means there is no usable commentary: no backend is configured or
    /// the provider rejected the credentials. Exhausted retries and unexpected
    /// failures return the fallback sentence instead.
    pub async fn generate(&self, req: &CommentaryRequest<'_>) -> Option<String> {
        let Some(backend) = &self.backend else {
            tracing::error!("OPENAI_API_KEY is not configured");
            return None;
        };

        let fallback = || fallback_comment(req.stock_name, req.change_rate, req.kind);

        let prompt = match render_prompt(&self.hbs, req) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(stock_code = req.stock_code, error = %e, "prompt render failed, using fallback comment");
                return Some(fallback());
            }
        };

        tracing::debug!(stock_code = req.stock_code, "requesting commentary");

        for attempt in 0..self.retry.max_attempts {
            match backend.complete(SYSTEM_PROMPT, &prompt).await {
                Ok(c) => {
                    tracing::info!(
                        stock_code = req.stock_code,
                        tokens = c.total_tokens,
                        "commentary generated"
                    );
                    return Some(c.content);
                }
                Err(e @ LlmError::Auth(_)) => {
                    tracing::error!(error = %e, "LLM credentials rejected");
                    return None;
                }
                Err(e) if e.is_retryable() => {
                    if attempt + 1 >= self.retry.max_attempts {
                        tracing::error!(
                            stock_code = req.stock_code,
                            error = %e,
                            "LLM call failed on final attempt, using fallback comment"
                        );
                        return Some(fallback());
                    }

                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        delay_secs = delay.as_secs_f64(),
                        error = %e,
                        "LLM call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        stock_code = req.stock_code,
                        error = %e,
                        "unexpected LLM failure, using fallback comment"
                    );
                    return Some(fallback());
                }
            }
        }

        Some(fallback())
    }
}
