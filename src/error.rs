use thiserror::Error;

use crate::session::Stage;

/// Generic message used when the service gives no detail for a failed generation
pub(crate) const GENERATION_FALLBACK_MESSAGE: &str =
    "Failed to generate content. Please try again.";

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors surfaced at the session boundary
///
/// The display text is what the user sees in the error slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Invalid credentials. Username must be \"{}\"", crate::auth::ADMIN_USERNAME)]
    InvalidCredentials,

    #[error("Failed to upload file. Please try again.")]
    UploadFailed,

    #[error("{0}")]
    GenerationFailed(String),

    #[error("Variant index {index} is out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Failed to fetch history: {0}")]
    HistoryFetchFailed(String),

    #[error("Cannot {operation} while in the {stage} stage")]
    InvalidStage {
        operation: &'static str,
        stage: Stage,
    },

    #[error("Please select a transcript file first")]
    NoFileSelected,
}

impl SessionError {
    /// Build a generation failure from an optional server detail message
    pub(crate) fn generation_failed(detail: Option<String>) -> Self {
        let message = detail
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| GENERATION_FALLBACK_MESSAGE.to_string());
        SessionError::GenerationFailed(message)
    }

    /// Whether repeating the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::UploadFailed | SessionError::GenerationFailed(_)
        )
    }
}

/// Transport errors from the meeting service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Server error ({status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    ServerError { status: u16, detail: Option<String> },

    #[error("Invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ServiceError {
    /// Server-supplied detail message, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            ServiceError::ServerError { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_message() {
        assert_eq!(
            SessionError::InvalidCredentials.to_string(),
            "Invalid credentials. Username must be \"admin\""
        );
    }

    #[test]
    fn test_generation_failed_uses_detail() {
        let err = SessionError::generation_failed(Some("API Key not found".to_string()));
        assert_eq!(err.to_string(), "API Key not found");
    }

    #[test]
    fn test_generation_failed_falls_back() {
        assert_eq!(
            SessionError::generation_failed(None).to_string(),
            GENERATION_FALLBACK_MESSAGE
        );
        assert_eq!(
            SessionError::generation_failed(Some("  ".to_string())).to_string(),
            GENERATION_FALLBACK_MESSAGE
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(SessionError::UploadFailed.is_retryable());
        assert!(SessionError::generation_failed(None).is_retryable());
        assert!(!SessionError::InvalidCredentials.is_retryable());
        assert!(!SessionError::IndexOutOfRange { index: 3, len: 3 }.is_retryable());
    }

    #[test]
    fn test_server_error_detail() {
        let err = ServiceError::ServerError {
            status: 500,
            detail: Some("boom".to_string()),
        };
        assert_eq!(err.detail(), Some("boom"));
        assert_eq!(err.to_string(), "Server error (500): boom");
    }
}
