use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::gateways::RecognitionError;

pub const MISSING_IMAGE_MESSAGE: &str = "No image file provided";

/// Failure of one stage of an OCR request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OcrError {
    #[error("{}", MISSING_IMAGE_MESSAGE)]
    MissingInput,
    #[error("{0}")]
    RecognitionFailed(String),
    #[error("{0}")]
    TranslationFailed(String),
    #[error("{0}")]
    Unexpected(String),
}

impl OcrError {
    pub fn status(&self) -> StatusCode {
        match self {
            OcrError::MissingInput => StatusCode::BAD_REQUEST,
            OcrError::RecognitionFailed(_)
            | OcrError::TranslationFailed(_)
            | OcrError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            OcrError::MissingInput => "input",
            OcrError::RecognitionFailed(_) => "recognition",
            OcrError::TranslationFailed(_) => "translation",
            OcrError::Unexpected(_) => "unexpected",
        }
    }

    /// JSON body sent back to the caller.
    ///
    /// Input and recognition failures use the bare `{"error"}` envelope;
    /// everything past recognition reports `success: false` as well.
    pub fn body(&self) -> serde_json::Value {
        match self {
            OcrError::MissingInput | OcrError::RecognitionFailed(_) => {
                json!({ "error": self.to_string() })
            }
            OcrError::TranslationFailed(_) | OcrError::Unexpected(_) => {
                json!({ "success": false, "error": self.to_string() })
            }
        }
    }
}

impl From<anyhow::Error> for OcrError {
    fn from(err: anyhow::Error) -> Self {
        OcrError::Unexpected(err.to_string())
    }
}

impl From<RecognitionError> for OcrError {
    fn from(err: RecognitionError) -> Self {
        match err {
            RecognitionError::Reported(message) => OcrError::RecognitionFailed(message),
            RecognitionError::Transport(err) => OcrError::Unexpected(err.to_string()),
        }
    }
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        tracing::warn!("ocr request failed at {} stage: {}", self.stage(), self);
        (self.status(), Json(self.body())).into_response()
    }
}
