use crate::config::AiSettings;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionResponseFormat,
    ChatCompletionResponseFormatType, CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const MAX_RETRIES: u64 = 2;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI credentials are not configured")]
    MissingCredentials,
    #[error("AI transport error: {0}")]
    Transport(String),
    #[error("AI call timed out after {0:?}")]
    Timeout(Duration),
    #[error("AI returned an empty response")]
    EmptyResponse,
    #[error("AI returned malformed output: {0}")]
    Malformed(String),
}

impl From<OpenAIError> for AiError {
    fn from(err: OpenAIError) -> Self {
        AiError::Transport(err.to_string())
    }
}

/// Per-call knobs. `temperature: None` leaves the provider default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub json: bool,
    pub temperature: Option<f32>,
}

/// Text completion capability of an external language model.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str, options: CompletionOptions) -> Result<String, AiError>;
}

pub fn backend_from_settings(settings: &AiSettings) -> Arc<dyn CompletionBackend> {
    match settings.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Arc::new(TimedBackend::new(
            Arc::new(OpenAiBackend::new(key.to_string(), settings.model.clone())),
            settings.timeout,
        )),
        _ => {
            tracing::warn!("OPENAI_API_KEY not set, AI calls will use keyword fallback");
            Arc::new(DisabledBackend)
        }
    }
}

/// Strict JSON decode of a model reply into `T`.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, AiError> {
    serde_json::from_str(raw.trim()).map_err(|e| AiError::Malformed(e.to_string()))
}

/// Bounds every call of the wrapped backend, retries included.
pub struct TimedBackend {
    inner: Arc<dyn CompletionBackend>,
    limit: Duration,
}

impl TimedBackend {
    pub fn new(inner: Arc<dyn CompletionBackend>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl CompletionBackend for TimedBackend {
    async fn complete(&self, system: &str, prompt: &str, options: CompletionOptions) -> Result<String, AiError> {
        timeout(self.limit, self.inner.complete(system, prompt, options))
            .await
            .map_err(|_| AiError::Timeout(self.limit))?
    }
}

#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String, model: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        let client = Client::with_config(config);
        Self { client, model }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, system: &str, prompt: &str, options: CompletionOptions) -> Result<String, AiError> {
        let mut retries = 0;

        loop {
            let messages: Vec<ChatCompletionRequestMessage> = vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ];

            let mut builder = CreateChatCompletionRequestArgs::default();
            builder.model(self.model.as_str()).messages(messages);
            if let Some(temperature) = options.temperature {
                builder.temperature(temperature);
            }
            if options.json {
                builder.response_format(ChatCompletionResponseFormat {
                    r#type: ChatCompletionResponseFormatType::JsonObject,
                });
            }
            let request = builder.build()?;

            match self.client.chat().create(request).await {
                Ok(resp) => {
                    return resp
                        .choices
                        .first()
                        .and_then(|c| c.message.content.clone())
                        .filter(|content| !content.trim().is_empty())
                        .ok_or(AiError::EmptyResponse);
                }
                Err(err) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(err.into());
                    }
                    tracing::debug!("OpenAI call failed (attempt {}): {}", retries, err);
                    sleep(Duration::from_millis(500 * retries)).await;
                }
            }
        }
    }
}

/// Used when no API key is configured. Fails immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledBackend;

#[async_trait]
impl CompletionBackend for DisabledBackend {
    async fn complete(&self, _system: &str, _prompt: &str, _options: CompletionOptions) -> Result<String, AiError> {
        Err(AiError::MissingCredentials)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned replies in order and records the prompts it saw.
    pub struct ScriptedBackend {
        replies: Mutex<Vec<Result<String, AiError>>>,
        delay: Option<Duration>,
        pub prompts: Mutex<Vec<String>>,
        pub options: Mutex<Vec<CompletionOptions>>,
    }

    impl ScriptedBackend {
        pub fn new(replies: Vec<Result<String, AiError>>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                delay: None,
                prompts: Mutex::new(Vec::new()),
                options: Mutex::new(Vec::new()),
            }
        }

        /// Sleeps this long before every reply.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn replying(reply: &str) -> Self {
            Self::new(vec![Ok(reply.to_string())])
        }

        pub fn failing() -> Self {
            Self::new(vec![Err(AiError::Transport("connection refused".to_string()))])
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().cloned()
        }

        pub fn last_options(&self) -> Option<CompletionOptions> {
            self.options.lock().unwrap().last().copied()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, _system: &str, prompt: &str, options: CompletionOptions) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.options.lock().unwrap().push(options);
            if let Some(delay) = self.delay {
                sleep(delay).await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(AiError::Transport("no scripted reply left".to_string())))
        }
    }
}
