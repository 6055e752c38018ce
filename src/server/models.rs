use serde::Serialize;

use crate::router::TranslationOutcome;

/// Success body of `POST /ocr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcrResponse {
    pub success: bool,
    pub original_text: String,
    pub english_text: String,
    pub translated_by_cloud_translate: bool,
}

impl From<TranslationOutcome> for OcrResponse {
    fn from(outcome: TranslationOutcome) -> Self {
        Self {
            success: true,
            original_text: outcome.original_text,
            english_text: outcome.rendered_text,
            translated_by_cloud_translate: outcome.was_translated,
        }
    }
}
