use std::io;
use std::time::Duration;
use actix_web::{HttpResponse, ResponseError};
use actix_web::http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Failures raised while relaying a request to the prediction service.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Failed to reach prediction service: {0}")]
    Network(String),
    #[error("Prediction service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Prediction failed: {0}")]
    Remote(String),
    #[error("Prediction timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unexpected response from prediction service: {0}")]
    MalformedResponse(String),
    #[error("Could not read audio for prediction: {0}")]
    Input(String),
}

impl From<reqwest::Error> for PredictionError {
    fn from(err: reqwest::Error) -> PredictionError {
        if err.is_decode() {
            PredictionError::MalformedResponse(err.to_string())
        } else {
            PredictionError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("No audio file uploaded")]
    MissingAudio,
    #[error("Invalid file type. Please upload .wav or .mp3")]
    InvalidFileType,
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),
    #[error("Audio file exceeds the {limit} byte limit")]
    UploadTooLarge { limit: u64 },
    #[error("Failed to store uploaded audio: {0}")]
    Storage(#[from] io::Error),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

pub type RelayResult<T> = Result<T, RelayError>;

impl ResponseError for RelayError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({"error": self.to_string()}))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingAudio
            | RelayError::InvalidFileType
            | RelayError::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            RelayError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Storage(_) | RelayError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
