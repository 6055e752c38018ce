use axum::extract::Multipart;
use axum::extract::multipart::MultipartRejection;
use tracing::debug;

use super::models::OcrResponse;
use super::state::ServerState;
use crate::error::OcrError;
use crate::pipeline::process_image;

pub(crate) const IMAGE_FIELD: &str = "image";

pub(crate) async fn ocr_request(
    state: &ServerState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<OcrResponse, OcrError> {
    // A body that is not multipart carries no image field either.
    let Ok(multipart) = multipart else {
        return Err(OcrError::MissingInput);
    };
    let image = read_image_field(multipart)
        .await?
        .ok_or(OcrError::MissingInput)?;
    let outcome = process_image(
        state.recognizer.as_ref(),
        state.translator.as_ref(),
        &state.detector,
        &state.languages,
        image,
    )
    .await?;
    Ok(OcrResponse::from(outcome))
}

async fn read_image_field(mut multipart: Multipart) -> Result<Option<Vec<u8>>, OcrError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| OcrError::Unexpected(format!("failed to read upload: {}", err)))?
    {
        // Only file parts count as uploads; a plain text field named `image` is skipped.
        if field.name() != Some(IMAGE_FIELD) || field.file_name().is_none() {
            debug!(
                "ocr: skipping form field {:?} (file name {:?})",
                field.name(),
                field.file_name()
            );
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| OcrError::Unexpected(format!("failed to read image: {}", err)))?;
        return Ok(Some(bytes.to_vec()));
    }
    Ok(None)
}
