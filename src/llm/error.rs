use thiserror::Error;

/// Failure of a remote generation call, classified for the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Technique selection produced no usable catalog names
    #[error("technique selection returned no usable techniques")]
    SelectionFailed,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("content filtered: {0}")]
    ContentFiltered(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("connection problem: {0}")]
    Connectivity(String),
}

impl GenerationError {
    /// The message shown in the error panel or on a result card
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::SelectionFailed => {
                "The AI couldn't pick techniques for this prompt. Try again or choose techniques manually."
            }
            GenerationError::MalformedResponse(_) => {
                "The AI response wasn't in a valid format. Please try again."
            }
            GenerationError::ContentFiltered(_) => {
                "Your request was blocked by safety filters. Please rephrase your prompt."
            }
            GenerationError::RateLimited(_) => {
                "Too many requests right now. Wait a moment and try again."
            }
            GenerationError::InvalidCredentials(_) => {
                "The API key is missing or invalid. Run 'promptsmith --setup' to configure it."
            }
            GenerationError::Connectivity(_) => {
                "Couldn't reach the AI service. Check your connection and try again."
            }
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GenerationError::SelectionFailed => "Selection failed",
            GenerationError::MalformedResponse(_) => "Malformed response",
            GenerationError::ContentFiltered(_) => "Content filtered",
            GenerationError::RateLimited(_) => "Rate limited",
            GenerationError::InvalidCredentials(_) => "Invalid credentials",
            GenerationError::Connectivity(_) => "Connection problem",
        }
    }

    /// Map an HTTP status and/or provider message onto a class
    pub fn classify(status: Option<u16>, detail: &str) -> Self {
        let lower = detail.to_lowercase();
        let detail = detail.to_string();

        if lower.contains("safety")
            || lower.contains("moderation")
            || lower.contains("content_filter")
            || lower.contains("flagged")
        {
            return GenerationError::ContentFiltered(detail);
        }
        if status == Some(429)
            || lower.contains("rate limit")
            || lower.contains("resource has been exhausted")
            || lower.contains("too many requests")
        {
            return GenerationError::RateLimited(detail);
        }
        let words = lower.replace('_', " ");
        if matches!(status, Some(401) | Some(403))
            || words.contains("api key not valid")
            || words.contains("invalid api key")
            || lower.contains("no auth credentials")
        {
            return GenerationError::InvalidCredentials(detail);
        }
        GenerationError::Connectivity(detail)
    }

    /// Rewrite the carried detail, keeping the class
    pub fn map_detail(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            GenerationError::SelectionFailed => GenerationError::SelectionFailed,
            GenerationError::MalformedResponse(d) => GenerationError::MalformedResponse(f(d)),
            GenerationError::ContentFiltered(d) => GenerationError::ContentFiltered(f(d)),
            GenerationError::RateLimited(d) => GenerationError::RateLimited(f(d)),
            GenerationError::InvalidCredentials(d) => GenerationError::InvalidCredentials(f(d)),
            GenerationError::Connectivity(d) => GenerationError::Connectivity(f(d)),
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Connectivity("request timed out".to_string())
        } else if err.is_connect() {
            GenerationError::Connectivity("could not connect".to_string())
        } else if err.is_decode() {
            GenerationError::MalformedResponse(err.to_string())
        } else {
            GenerationError::classify(err.status().map(|s| s.as_u16()), &err.to_string())
        }
    }
}
