use thiserror::Error;

/// Failure raised by a remote AI collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Failed(String),
}

impl ServiceError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Terminal outcome of an image generation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Missing Gemini API key. Set image_generation.api_key or the GEMINI_API_KEY environment variable.")]
    MissingApiKey,

    #[error("API Quota exhausted. Please wait a minute or check your billing details.")]
    QuotaExhausted,

    #[error("The AI did not return image data.")]
    NoImageData,

    #[error("{0}")]
    Service(String),

    #[error("No slide at position {0}")]
    NoSuchSlide(usize),

    #[error("A generation is already running")]
    Busy,
}

impl GenerationError {
    /// Message shown to the presenter.
    pub fn toast(&self) -> String {
        match self {
            Self::QuotaExhausted => self.to_string(),
            other => format!("Generation failed: {other}"),
        }
    }
}
