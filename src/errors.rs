use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// User-facing text shown whenever the scoring endpoint could not produce a result.
pub const SCORING_UNAVAILABLE_MESSAGE: &str =
    "The scoring service could not produce a prediction right now. Please try again.";

/// Application-specific error types.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Missing or invalid configuration at startup. Fatal.
    ConfigurationError(String),
    /// A submitted field is missing or does not parse to its declared type.
    ValidationError(Vec<String>),
    /// Network failure, timeout or non-2xx status from the scoring endpoint.
    RemoteScoringError(String),
    /// The scoring endpoint answered with JSON that matches neither schema.
    MalformedResponseError(String),
}

impl AppError {
    /// HTTP status used for this error on both the HTML and JSON surfaces.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RemoteScoringError(_) | AppError::MalformedResponseError(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Messages safe to show to the person filling in the form.
    ///
    /// Validation problems are echoed back one per line; everything coming from
    /// the remote side collapses into a single generic message.
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            AppError::ValidationError(problems) => problems.clone(),
            AppError::RemoteScoringError(_) | AppError::MalformedResponseError(_) => {
                vec![SCORING_UNAVAILABLE_MESSAGE.to_string()]
            }
            AppError::ConfigurationError(_) => vec!["Internal server error".to_string()],
        }
    }

    /// Emits the log line matching the severity of this error.
    pub fn log(&self) {
        match self {
            AppError::ValidationError(problems) => {
                tracing::debug!("Rejected submission: {}", problems.join("; "));
            }
            AppError::RemoteScoringError(msg) => {
                tracing::error!("Remote scoring error: {}", msg);
            }
            AppError::MalformedResponseError(msg) => {
                tracing::error!("Malformed scoring response (possible schema drift): {}", msg);
            }
            AppError::ConfigurationError(msg) => {
                tracing::error!("Configuration error: {}", msg);
            }
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(problems) => {
                write!(f, "Validation error: {}", problems.join("; "))
            }
            AppError::RemoteScoringError(msg) => write!(f, "Remote scoring error: {}", msg),
            AppError::MalformedResponseError(msg) => {
                write!(f, "Malformed scoring response: {}", msg)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into a JSON HTTP response.
    ///
    /// Remote failures are logged in full but only the generic message reaches the client.
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let body = match &self {
            AppError::ValidationError(problems) => json!({
                "error": "Invalid customer record",
                "details": problems,
            }),
            _ => json!({
                "error": self.user_messages().join(" "),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::RemoteScoringError(format!("Scoring request timed out: {}", err))
        } else {
            AppError::RemoteScoringError(format!("Scoring request failed: {}", err))
        }
    }
}
