//! Anthropic Messages API client (API key auth, streaming only).

use anyhow::Result;
use futures_util::StreamExt;
use futures_util::future::BoxFuture;

use super::sse::SseParser;
use super::types::{StreamingMessagesRequest, build_api_messages, build_tool_defs};
use crate::message::{Message, ToolDefinition};
use crate::providers::{
    ModelClient, ModelStream, ProviderError, ProviderErrorKind, USER_AGENT, resolve_api_key,
    resolve_base_url,
};

/// Default base URL for the Anthropic API.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic client.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl AnthropicConfig {
    /// Creates a new config from environment.
    ///
    /// API key resolution order:
    /// 1. `config_api_key` parameter (from config file)
    /// 2. `ANTHROPIC_API_KEY` environment variable
    ///
    /// Base URL resolution order:
    /// 1. `ANTHROPIC_BASE_URL` env var (if set and non-empty)
    /// 2. `config_base_url` parameter (if Some and non-empty)
    /// 3. Default: `https://api.anthropic.com`
    pub fn from_env(
        model: String,
        max_tokens: u32,
        system_prompt: Option<String>,
        config_base_url: Option<&str>,
        config_api_key: Option<&str>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(config_api_key, "ANTHROPIC_API_KEY", "anthropic")?;
        let base_url = resolve_base_url(
            config_base_url,
            "ANTHROPIC_BASE_URL",
            DEFAULT_BASE_URL,
            "Anthropic",
        )?;

        Ok(Self {
            api_key,
            base_url,
            model,
            max_tokens,
            system_prompt,
        })
    }
}

/// Anthropic API client.
pub struct AnthropicClient {
    config: AnthropicConfig,
    http: reqwest::Client,
}

impl AnthropicClient {
    /// Creates a new Anthropic client with the given configuration.
    ///
    /// # Panics
    /// - In test builds, panics if `base_url` is the production API.
    /// - At runtime, panics if `TERN_BLOCK_REAL_API=1` and `base_url` is
    ///   the production API.
    ///
    /// This prevents tests from accidentally making real network requests.
    /// Use `ANTHROPIC_BASE_URL` env var or config to point to a mock server.
    #[must_use]
    pub fn new(config: AnthropicConfig) -> Self {
        #[cfg(test)]
        assert!(
            config.base_url != DEFAULT_BASE_URL,
            "Tests must not use the production Anthropic API!\n\
             Set ANTHROPIC_BASE_URL to a mock server (e.g., wiremock).\n\
             Found base_url: {}",
            config.base_url
        );

        #[cfg(not(test))]
        if std::env::var("TERN_BLOCK_REAL_API").is_ok_and(|v| v == "1")
            && config.base_url == DEFAULT_BASE_URL
        {
            panic!(
                "TERN_BLOCK_REAL_API=1 but trying to use production Anthropic API!\n\
                 Set ANTHROPIC_BASE_URL to a mock server.\n\
                 Found base_url: {}",
                config.base_url
            );
        }

        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn send_messages_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelStream> {
        let request = StreamingMessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: build_api_messages(messages),
            tools: build_tool_defs(tools),
            system: self.config.system_prompt.as_deref(),
            stream: true,
        };

        let url = format!("{}/v1/messages", self.config.base_url);
        tracing::debug!(model = %self.config.model, messages = messages.len(), "sending streaming request");

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .header("user-agent", USER_AGENT)
            .header("anthropic-version", API_VERSION)
            .header("x-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http_status(status.as_u16(), &error_body).into());
        }

        let event_stream = SseParser::new(response.bytes_stream());
        Ok(event_stream.boxed())
    }
}

impl ModelClient for AnthropicClient {
    fn stream_message<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolDefinition],
    ) -> BoxFuture<'a, Result<ModelStream>> {
        Box::pin(self.send_messages_stream(messages, tools))
    }
}

fn classify_reqwest_error(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::timeout(format!("Connection failed: {e}"))
    } else if e.is_request() {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Request error: {e}"))
    } else {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Network error: {e}"))
    }
}
