use serde::Serialize;
use tracing::{debug, info};

use crate::error::OcrError;
use crate::gateways::{LanguagePair, TranslationGateway};
use crate::script::ScriptDetector;

/// Result of routing extracted text through the optional translation step.
///
/// When `was_translated` is false, `rendered_text` is `original_text` unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationOutcome {
    pub original_text: String,
    pub rendered_text: String,
    pub was_translated: bool,
}

impl TranslationOutcome {
    fn untranslated(text: String) -> Self {
        Self {
            rendered_text: text.clone(),
            original_text: text,
            was_translated: false,
        }
    }
}

/// Translates `extracted_text` only when it contains the detector's script.
///
/// The gateway is called at most once, and never when the script test fails.
/// A gateway failure is returned as `TranslationFailed`, never masked.
pub async fn route<T>(
    extracted_text: String,
    detector: &ScriptDetector,
    translator: &T,
    languages: &LanguagePair,
) -> Result<TranslationOutcome, OcrError>
where
    T: TranslationGateway + ?Sized,
{
    if !detector.contains_target_script(&extracted_text) {
        debug!("router: target script not found; skipping translation");
        return Ok(TranslationOutcome::untranslated(extracted_text));
    }

    info!(
        "router: translating {} chars ({} -> {})",
        extracted_text.chars().count(),
        languages.source,
        languages.target
    );
    let rendered_text = translator
        .translate(extracted_text.clone(), languages.clone())
        .await
        .map_err(|err| OcrError::TranslationFailed(err.to_string()))?;
    Ok(TranslationOutcome {
        original_text: extracted_text,
        rendered_text,
        was_translated: true,
    })
}
