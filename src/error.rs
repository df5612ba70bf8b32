use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;

/// Error envelope returned to callers on every failure path.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
}

fn budget_name(advanced: &bool) -> &'static str {
    if *advanced {
        "Advanced"
    } else {
        "Basic"
    }
}

/// Failure taxonomy for the analysis pipeline. Each variant carries an
/// explicit kind so the HTTP mapping never has to inspect message text.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("{} request quota exhausted for the current 24-hour window", budget_name(.advanced))]
    Quota { advanced: bool },

    #[error("Answer service did not respond within {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Answer service request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to extract a result from the answer service response: {0}")]
    Extraction(String),

    #[error("Answer service response has an unusable shape: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Stable tag surfaced in the `type` field of the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Auth(_) => "auth",
            AppError::Quota { .. } => "quota",
            AppError::Timeout { .. } => "timeout",
            AppError::Upstream { .. } => "upstream",
            AppError::Extraction(_) => "extraction",
            AppError::Schema(_) => "schema",
            AppError::Config(_) => "config",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Quota { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Extraction(_) | AppError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "Invalid request",
            AppError::Auth(_) => "Unauthorized",
            AppError::Quota { .. } => "Rate limit exceeded",
            AppError::Timeout { .. } => "Analysis timed out",
            AppError::Upstream { .. } => "Failed to analyze product",
            AppError::Extraction(_) | AppError::Schema(_) => "Could not process analysis response",
            AppError::Config(_) => "Service misconfigured",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.summary().to_string(),
            details: self.to_string(),
            kind: self.kind().to_string(),
            timestamp: Utc::now().to_rfc3339(),
        });

        (self.status_code(), body).into_response()
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
