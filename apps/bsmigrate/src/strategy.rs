//! External conversion strategy.
//!
//! A strategy is an optional, network-backed alternative to the local
//! rewriter. Every failure is recoverable: the engine falls back to local
//! rules for the file and records a note.

use crate::errors::StrategyError;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/google/flan-t5-large";
pub const DEFAULT_API_KEY_ENV: &str = "BSMIGRATE_API_KEY";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Content budget for analyze/suggest prompts. Conversion always sends the
/// whole file since truncated output would drop content.
const PROMPT_BUDGET: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Analyze,
    Convert,
    Suggest,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Analyze => "analyze",
            Operation::Convert => "convert",
            Operation::Suggest => "suggest",
        }
    }
}

pub trait ConversionStrategy: Send + Sync {
    fn invoke(&self, content: &str, op: Operation) -> Result<String, StrategyError>;

    /// Short label for logs and notes.
    fn name(&self) -> &str {
        "external"
    }
}

/// Hosted text-generation endpoint taking `{"inputs": prompt}`.
pub struct HttpStrategy {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl HttpStrategy {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        api_key_env: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StrategyError> {
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .build()?;
        Ok(HttpStrategy {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_key_env: api_key_env.into(),
        })
    }

    /// Read the credential from the environment variable `api_key_env`.
    pub fn from_env(
        endpoint: impl Into<String>,
        api_key_env: &str,
        timeout: Duration,
    ) -> Result<Self, StrategyError> {
        let key = std::env::var(api_key_env).ok();
        Self::new(endpoint, key, api_key_env, timeout)
    }
}

impl ConversionStrategy for HttpStrategy {
    fn invoke(&self, content: &str, op: Operation) -> Result<String, StrategyError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(StrategyError::MissingCredential {
                env_var: self.api_key_env.clone(),
            });
        };
        let payload = json!({ "inputs": prompt(content, op) });
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&payload)
            .send()
            .map_err(classify_transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(StrategyError::Status {
                code: status.as_u16(),
            });
        }
        let body: Value = response.json().map_err(classify_transport)?;
        generated_text(&body)
    }

    fn name(&self) -> &str {
        &self.endpoint
    }
}

fn classify_transport(err: reqwest::Error) -> StrategyError {
    if err.is_timeout() {
        StrategyError::Timeout
    } else {
        StrategyError::Transport(err)
    }
}

fn prompt(content: &str, op: Operation) -> String {
    match op {
        Operation::Analyze => format!(
            "Analyze this Bootstrap 3 code and list every change needed for Bootstrap 5:\n\n{}",
            truncate(content, PROMPT_BUDGET)
        ),
        Operation::Convert => format!(
            "Convert this Bootstrap 3 code to Bootstrap 5. Put modal titles before a \
             <button type=\"button\" class=\"btn-close\" data-bs-dismiss=\"modal\" aria-label=\"Close\"></button> \
             close button. Return only the converted code:\n\n{}",
            content
        ),
        Operation::Suggest => format!(
            "Suggest how to migrate this Bootstrap 3 code to Bootstrap 5:\n\n{}",
            truncate(content, PROMPT_BUDGET)
        ),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Accepts `[{"generated_text": ..}]` or `{"generated_text": ..}`.
fn generated_text(body: &Value) -> Result<String, StrategyError> {
    let item = match body {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    if let Some(text) = item
        .and_then(|v| v.get("generated_text"))
        .and_then(Value::as_str)
    {
        return Ok(text.to_string());
    }
    let detail = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("missing generated_text");
    Err(StrategyError::MalformedResponse(detail.to_string()))
}
