use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No HTTP response was obtained (DNS, refused connection, reset).
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response arrived with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
        /// Raw response body, untruncated.
        body: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error messages lifted from response bodies
const MAX_ERROR_MESSAGE_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a message to avoid logging excessive data
    fn truncate(message: &str) -> String {
        if message.len() <= MAX_ERROR_MESSAGE_LENGTH {
            return message.to_string();
        }
        let mut end = MAX_ERROR_MESSAGE_LENGTH;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &message[..end],
            message.len()
        )
    }

    /// Build a status error, preferring the server's `{"message": ...}` when present.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .map(|m| Self::truncate(&m))
            .unwrap_or_else(|| Self::generic_message(status));

        ApiError::Status {
            status,
            message,
            body: body.to_string(),
        }
    }

    fn generic_message(status: StatusCode) -> String {
        match status.as_u16() {
            401 => "Unauthorized - session may have expired".to_string(),
            403 => "Access denied".to_string(),
            404 => "Resource not found".to_string(),
            429 => "Rate limited - please wait before retrying".to_string(),
            500..=599 => format!("Server error ({})", status.as_u16()),
            _ => format!("Request failed with status {}", status.as_u16()),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a 401, which callers treat as "session no longer valid".
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// Short text suitable for an alert.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Transport(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::Transport(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            ApiError::InvalidResponse(_) => "Unexpected response from server".to_string(),
            ApiError::InvalidRequest(msg) => format!("Invalid request: {}", msg),
        }
    }
}
