//! Blocking client for an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::{parse_completion, EnhanceRequest, EnhanceResponse, Enhancer};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct EnhancerConfig {
    /// Full URL of the chat completions endpoint
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 800,
            timeout_ms: 30_000,
        }
    }
}

impl EnhancerConfig {
    /// Defaults overridden by `CVPRESS_ENHANCE_URL`, `CVPRESS_ENHANCE_MODEL`
    /// and `CVPRESS_API_KEY`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var("CVPRESS_ENHANCE_URL") {
            cfg.endpoint = url;
        }
        if let Ok(model) = std::env::var("CVPRESS_ENHANCE_MODEL") {
            cfg.model = model;
        }
        cfg.api_key = std::env::var("CVPRESS_API_KEY").ok().filter(|k| !k.is_empty());
        cfg
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

pub struct HttpEnhancer {
    client: reqwest::blocking::Client,
    config: EnhancerConfig,
}

impl HttpEnhancer {
    pub fn new(config: EnhancerConfig) -> Result<Self> {
        url::Url::parse(&config.endpoint)
            .map_err(|e| Error::ConfigError(format!("enhance endpoint {:?}: {}", config.endpoint, e)))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::NetworkError(e.to_string()))?;
        Ok(Self { client, config })
    }
}

impl Enhancer for HttpEnhancer {
    fn enhance(&self, request: &EnhanceRequest) -> Result<EnhanceResponse> {
        request.validate()?;
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": request.system_prompt() },
                { "role": "user", "content": request.text },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let mut req = self
            .client
            .post(&self.config.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().map_err(|e| Error::NetworkError(e.to_string()))?;
        let status = resp.status();
        let text = resp.text().map_err(|e| Error::NetworkError(e.to_string()))?;

        if !status.is_success() {
            log::warn!("enhance service answered {}, using the body as plain text", status);
            return Ok(parse_completion(&text));
        }

        let content = match serde_json::from_str::<ChatCompletion>(&text) {
            Ok(completion) => completion.choices.into_iter().next().and_then(|c| c.message.content),
            Err(e) => {
                log::warn!("unexpected completion envelope: {}", e);
                Some(text)
            }
        };
        match content {
            Some(c) if !c.trim().is_empty() => Ok(parse_completion(&c)),
            _ => Err(Error::NetworkError("Failed to enhance text: empty completion".into())),
        }
    }
}
