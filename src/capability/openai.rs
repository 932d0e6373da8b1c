//! OpenAI-compatible intelligence provider.
//!
//! Talks to any server exposing the `/chat/completions` and
//! `/images/generations` endpoints of the OpenAI API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::error::CapabilityError;
use crate::capability::functions::{FunctionCall, FunctionDefinition, Functions};
use crate::capability::intelligence::{
    Answer, ChatMessage, GeneratedImage, ImageResult, ImageSize, Intelligence,
};
use crate::core::Payload;

/// Configuration for the OpenAI client
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL (default: https://api.openai.com/v1)
    pub base_url: String,
    /// Chat model (default: gpt-3.5-turbo)
    pub model: String,
    /// System message prepended to every conversation
    pub system: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            system: "You are a friendly assistant, ready to help with any task".to_string(),
        }
    }
}

/// Request structure for chat completions
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [FunctionDefinition]>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// `content` is null when the model answers with a function call.
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    size: ImageSize,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

/// An [`Intelligence`] backed by an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct OpenAi {
    client: reqwest::Client,
    config: OpenAiConfig,
    functions: Functions,
}

impl OpenAi {
    /// Client for api.openai.com with the default model and system prompt
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(OpenAiConfig {
            api_key: api_key.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            functions: Functions::new(),
        }
    }

    /// Point the client at another OpenAI-compatible server
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the chat model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the system message
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.config.system = system.into();
        self
    }

    /// Offer `functions` to the model on every question
    pub fn functions(mut self, functions: Functions) -> Self {
        self.functions = functions;
        self
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// System message, then the prior context, then the question.
    fn conversation(&self, question: &str, context: Option<Vec<ChatMessage>>) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.config.system.clone())];
        messages.extend(context.unwrap_or_default());
        messages.push(ChatMessage::user(question));
        messages
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Turns a raw chat completion into an [`Answer`], running the requested
    /// function if the model asked for one.
    async fn answer(
        &self,
        mut messages: Vec<ChatMessage>,
        raw: Payload,
    ) -> Result<Answer, CapabilityError> {
        let response: ChatResponse = serde_json::from_value(raw)?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CapabilityError::InvalidResponse("Invalid response from AI".into()))?;

        let function_result = match &choice.message.function_call {
            Some(call) => Some(self.functions.dispatch(call).await?),
            None => None,
        };

        messages.push(ChatMessage {
            role: choice.message.role,
            content: choice.message.content.clone().unwrap_or_default(),
            function_call: choice.message.function_call,
        });

        Ok(Answer {
            text: choice.message.content,
            context: messages,
            usage: response.usage,
            finish_reason: choice.finish_reason,
            function_result,
        })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Payload, CapabilityError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            log::error!("OpenAI request to {} failed: HTTP {}", path, status);
            return Err(CapabilityError::ProviderError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(response.json().await?)
    }
}

fn image_result(raw: Payload) -> Result<ImageResult, CapabilityError> {
    let response: ImageResponse = serde_json::from_value(raw.clone())?;
    Ok(ImageResult {
        images: response.data,
        raw,
    })
}

#[async_trait]
impl Intelligence for OpenAi {
    async fn ask(
        &self,
        question: &str,
        context: Option<Vec<ChatMessage>>,
    ) -> Result<Answer, CapabilityError> {
        let messages = self.conversation(question, context);
        let raw = self
            .post(
                "chat/completions",
                &ChatRequest {
                    model: &self.config.model,
                    messages: &messages,
                    functions: (!self.functions.is_empty())
                        .then(|| self.functions.definitions()),
                },
            )
            .await?;

        self.answer(messages, raw).await
    }

    async fn ask_for_image(
        &self,
        prompt: &str,
        size: Option<ImageSize>,
    ) -> Result<ImageResult, CapabilityError> {
        let raw = self
            .post(
                "images/generations",
                &ImageRequest {
                    prompt,
                    size: size.unwrap_or_default(),
                    n: 1,
                },
            )
            .await?;

        image_result(raw)
    }
}
