//! Error kinds surfaced to the user by the converter.
//!
//! Every variant is recoverable: rate errors become an inline banner, camera
//! and OCR errors become an acknowledgement prompt. Nothing here is fatal.

use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum ConverterError {
    #[error("Network error: {0}")]
    TransportFailure(String),

    #[error("Unexpected API response: {0}")]
    MalformedResponse(String),

    #[error("Camera permission denied. Allow camera access for this app and try again.")]
    CameraPermissionDenied,

    #[error("No usable camera found: {0}")]
    CameraUnavailable(String),

    #[error("OCR failed: {0}")]
    OcrFailure(String),

    #[error("Couldn't find a price. Try closer, steady, and good lighting.")]
    NoPriceCandidateFound,
}

impl ConverterError {
    /// Rate errors are shown inline; everything else needs an acknowledgement.
    pub fn is_rate_error(&self) -> bool {
        matches!(
            self,
            ConverterError::TransportFailure(_) | ConverterError::MalformedResponse(_)
        )
    }
}

impl From<reqwest::Error> for ConverterError {
    fn from(err: reqwest::Error) -> Self {
        ConverterError::TransportFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConverterError>;
