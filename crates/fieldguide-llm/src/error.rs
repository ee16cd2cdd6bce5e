//! Error types for language-model providers.

use thiserror::Error;

/// Coarse failure category a caller can act on (re-authenticate, back off, retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    Auth,
    RateLimit,
    Network,
    Quota,
    Unknown,
}

impl GenerationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationErrorKind::Auth => "auth",
            GenerationErrorKind::RateLimit => "rate-limit",
            GenerationErrorKind::Network => "network",
            GenerationErrorKind::Quota => "quota",
            GenerationErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur when talking to a model provider.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The provider could not be reached.
    #[error("Cannot reach {host}: {message}")]
    Unreachable { host: String, message: String },

    /// The requested model is not available.
    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    /// Missing or rejected credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Too many requests.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Account quota or billing limit reached.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The token stream ended with an error.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Embedding dimension mismatch.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Category of this failure.
    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            LlmError::Authentication(_) => GenerationErrorKind::Auth,
            LlmError::RateLimited(_) => GenerationErrorKind::RateLimit,
            LlmError::QuotaExceeded(_) => GenerationErrorKind::Quota,
            LlmError::Timeout { .. } | LlmError::Unreachable { .. } | LlmError::Stream(_) => {
                GenerationErrorKind::Network
            }
            LlmError::Http(e) if e.is_connect() || e.is_timeout() || e.is_body() => {
                GenerationErrorKind::Network
            }
            _ => GenerationErrorKind::Unknown,
        }
    }

    /// Classify a non-success HTTP status and its body.
    pub fn from_status(status: u16, body: String, model: &str) -> Self {
        let lower = body.to_lowercase();
        match status {
            401 | 403 => LlmError::Authentication(body),
            429 if lower.contains("insufficient_quota") || lower.contains("quota") => {
                LlmError::QuotaExceeded(body)
            }
            429 => LlmError::RateLimited(body),
            404 => LlmError::ModelNotFound {
                model: model.to_string(),
            },
            _ if lower.contains("model") && lower.contains("not found") => LlmError::ModelNotFound {
                model: model.to_string(),
            },
            _ => LlmError::ApiError {
                status,
                message: body,
            },
        }
    }
}

/// Result type for provider operations.
pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            LlmError::from_status(401, "invalid api key".into(), "gpt").kind(),
            GenerationErrorKind::Auth
        );
        assert_eq!(
            LlmError::from_status(429, "slow down".into(), "gpt").kind(),
            GenerationErrorKind::RateLimit
        );
        assert_eq!(
            LlmError::from_status(429, r#"{"error":{"code":"insufficient_quota"}}"#.into(), "gpt").kind(),
            GenerationErrorKind::Quota
        );
        assert!(matches!(
            LlmError::from_status(404, String::new(), "llama3"),
            LlmError::ModelNotFound { model } if model == "llama3"
        ));
        assert_eq!(
            LlmError::from_status(500, "boom".into(), "gpt").kind(),
            GenerationErrorKind::Unknown
        );
    }

    #[test]
    fn test_network_kinds() {
        assert_eq!(LlmError::Timeout { seconds: 5 }.kind(), GenerationErrorKind::Network);
        assert_eq!(LlmError::Stream("reset".into()).kind(), GenerationErrorKind::Network);
        assert_eq!(GenerationErrorKind::RateLimit.to_string(), "rate-limit");
    }
}
