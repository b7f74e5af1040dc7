use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;

/// Failures talking to the chat service.
#[derive(Debug)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, TLS, connection).
    Transport(reqwest::Error),

    /// The service answered with a non-success status.
    Status {
        status: StatusCode,
        /// Human-readable summary pulled from the error body, when present.
        message: Option<String>,
    },

    /// The body of a successful response did not have the expected shape.
    Decode(serde_json::Error),

    /// An authenticated-only operation was attempted without a session.
    Unauthenticated,
}

impl ApiError {
    pub(crate) fn from_response_body(status: StatusCode, body: &str) -> Self {
        ApiError::Status {
            status,
            message: extract_error_summary(body),
        }
    }

    /// True when the service rejected the stored credentials.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            ApiError::Unauthenticated => true,
            _ => false,
        }
    }

    /// The message the service attached to a rejection, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(err) => write!(f, "could not reach the chat service: {err}"),
            ApiError::Status {
                message: Some(message),
                ..
            } => write!(f, "{message}"),
            ApiError::Status {
                status,
                message: None,
            } => write!(f, "the chat service returned {status}"),
            ApiError::Decode(err) => write!(f, "unexpected response from the chat service: {err}"),
            ApiError::Unauthenticated => write!(f, "you need to sign in first"),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Transport(err) => Some(err),
            ApiError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err)
    }
}

/// Pull a one-line summary out of an error body.
///
/// Understands `{"message": …}`, `{"error": "…"}` and `{"error": {"message": …}}`.
/// Plain-text bodies are used as-is when short enough to read in a banner.
fn extract_error_summary(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        if trimmed.starts_with('<') || trimmed.len() > 200 {
            return None;
        }
        return Some(collapse_whitespace(trimmed));
    };

    value
        .get("message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .map(|text| collapse_whitespace(&text))
        .filter(|text| !text.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
