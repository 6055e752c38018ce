use tracing::info;

use crate::error::OcrError;
use crate::gateways::{LanguagePair, RecognitionGateway, TranslationGateway};
use crate::router::{TranslationOutcome, route};
use crate::script::ScriptDetector;

/// Recognizes the text in `image`, then routes it through translation.
pub async fn process_image<R, T>(
    recognizer: &R,
    translator: &T,
    detector: &ScriptDetector,
    languages: &LanguagePair,
    image: Vec<u8>,
) -> Result<TranslationOutcome, OcrError>
where
    R: RecognitionGateway + ?Sized,
    T: TranslationGateway + ?Sized,
{
    info!(
        "ocr: received image ({} bytes, mime={})",
        image.len(),
        sniff_image_mime(&image).unwrap_or("unknown")
    );
    let extracted = recognizer.recognize(image).await.map_err(OcrError::from)?;
    let extracted = extracted.trim().to_string();
    info!("ocr: recognized {} chars", extracted.chars().count());
    route(extracted, detector, translator, languages).await
}

pub(crate) fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}
