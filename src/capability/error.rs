use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[cfg(feature = "llm")]
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Capability not configured: {0}")]
    NotConfigured(String),
}
