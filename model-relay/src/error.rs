use crate::services::generator::GeneratorError;
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub const MISSING_IMAGES_MESSAGE: &str = "Two images are required";
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Error generating 3D model";
const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Everything that can end a create-model request early.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Two images are required (received {received})")]
    MissingImages { received: usize },

    #[error("Image {file_name} exceeds the {limit} byte limit")]
    FileTooLarge { file_name: String, limit: usize },

    #[error("Failed to read multipart upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Failed to spool upload: {0}")]
    Spool(#[from] std::io::Error),

    #[error("Generator responded with {status}")]
    Upstream { status: reqwest::StatusCode },

    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

impl RelayError {
    /// Short, non-sensitive label used in JSON bodies and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            RelayError::MissingImages { .. } => "missing_images",
            RelayError::FileTooLarge { .. } => "file_too_large",
            RelayError::Multipart(_) => "malformed_upload",
            RelayError::Spool(_) => "upload_storage",
            RelayError::Upstream { .. } => "upstream_status",
            RelayError::Generator(GeneratorError::Transport(_)) => "generator_unreachable",
            RelayError::Generator(GeneratorError::Payload(_)) => "upload_storage",
            RelayError::Generator(GeneratorError::Body(_)) => "generator_body",
            RelayError::Generator(GeneratorError::Decode(_)) => "invalid_model_payload",
            RelayError::Generator(GeneratorError::Client(_)) => "generator_client",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingImages { .. } => StatusCode::BAD_REQUEST,
            RelayError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Multipart(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client mistakes are not system faults.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: &'static str,
            error: &'static str,
        }

        let status = self.status();
        match self {
            RelayError::MissingImages { .. } => (status, MISSING_IMAGES_MESSAGE).into_response(),
            RelayError::Upstream { .. } => (status, UPSTREAM_FAILURE_MESSAGE).into_response(),
            ref err if status == StatusCode::PAYLOAD_TOO_LARGE => {
                (status, err.to_string()).into_response()
            }
            err => (
                status,
                Json(ErrorResponse {
                    message: INTERNAL_ERROR_MESSAGE,
                    error: err.category(),
                }),
            )
                .into_response(),
        }
    }
}
