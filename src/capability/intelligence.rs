use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::error::CapabilityError;
use crate::capability::functions::FunctionCall;
use crate::core::Payload;

/// Language-model access for actions.
#[async_trait]
pub trait Intelligence: Send + Sync {
    /// Asks a question, optionally continuing an earlier conversation.
    async fn ask(
        &self,
        question: &str,
        context: Option<Vec<ChatMessage>>,
    ) -> Result<Answer, CapabilityError>;

    /// Requests an image for `prompt`. Providers that cannot draw return
    /// [`CapabilityError::Unsupported`].
    async fn ask_for_image(
        &self,
        prompt: &str,
        size: Option<ImageSize>,
    ) -> Result<ImageResult, CapabilityError>;
}

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// Set on assistant messages that asked for a function call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            function_call: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// The reply to [`Intelligence::ask`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Answer {
    pub text: Option<String>,
    /// The full conversation including this exchange, ready to pass back in.
    pub context: Vec<ChatMessage>,
    /// Provider usage metadata, passed through untouched.
    pub usage: Option<Payload>,
    pub finish_reason: Option<String>,
    /// What the dispatched function returned, when the model called one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_result: Option<Payload>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "256x256")]
    Small,
    #[serde(rename = "512x512")]
    Medium,
    #[serde(rename = "1024x1024")]
    Large,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Small => "256x256",
            ImageSize::Medium => "512x512",
            ImageSize::Large => "1024x1024",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
}

/// The reply to [`Intelligence::ask_for_image`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageResult {
    pub images: Vec<GeneratedImage>,
    /// The provider's raw response body.
    pub raw: Payload,
}

type CustomFuture = Pin<Box<dyn Future<Output = Result<String, CapabilityError>> + Send>>;
type CustomMethod = Arc<dyn Fn(String) -> CustomFuture + Send + Sync>;

/// An [`Intelligence`] backed by a user-supplied async function.
///
/// The function receives the question (or the image prompt) and returns the
/// reply text. [`CustomIntelligence::echo`] replies with the question itself.
#[derive(Clone)]
pub struct CustomIntelligence {
    method: CustomMethod,
}

impl CustomIntelligence {
    pub fn new<F, Fut>(method: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, CapabilityError>> + Send + 'static,
    {
        CustomIntelligence {
            method: Arc::new(move |question: String| -> CustomFuture { Box::pin(method(question)) }),
        }
    }

    pub fn echo() -> Self {
        Self::new(|question| async move { Ok(question) })
    }
}

impl Default for CustomIntelligence {
    fn default() -> Self {
        Self::echo()
    }
}

#[async_trait]
impl Intelligence for CustomIntelligence {
    async fn ask(
        &self,
        question: &str,
        context: Option<Vec<ChatMessage>>,
    ) -> Result<Answer, CapabilityError> {
        let reply = (self.method)(question.to_string()).await?;

        let mut conversation = context.unwrap_or_default();
        conversation.push(ChatMessage::user(question));
        conversation.push(ChatMessage::assistant(reply.clone()));

        Ok(Answer {
            text: Some(reply),
            context: conversation,
            usage: None,
            finish_reason: Some("stop".to_string()),
            function_result: None,
        })
    }

    async fn ask_for_image(
        &self,
        prompt: &str,
        _size: Option<ImageSize>,
    ) -> Result<ImageResult, CapabilityError> {
        let reply = (self.method)(prompt.to_string()).await?;
        Ok(ImageResult {
            images: Vec::new(),
            raw: Payload::String(reply),
        })
    }
}
