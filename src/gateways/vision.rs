use anyhow::{Context, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{RecognitionError, RecognitionFuture, RecognitionGateway, extract_google_error};
use crate::credentials::Credentials;

pub(crate) const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com";

/// Google Cloud Vision `TEXT_DETECTION` client.
#[derive(Debug, Clone)]
pub struct GoogleVision {
    client: reqwest::Client,
    credentials: Credentials,
    endpoint: String,
}

impl GoogleVision {
    pub fn new(client: reqwest::Client, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        if !endpoint.trim().is_empty() {
            self.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        self
    }

    async fn annotate(&self, image: &[u8]) -> anyhow::Result<String> {
        let url = format!("{}/v1/images:annotate", self.endpoint);
        let request = self
            .credentials
            .authorize(&self.client, self.client.post(&url))
            .await?;
        let response = request.json(&annotate_request_body(image)).send().await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| "failed to read Vision response body")?;
        if !status.is_success() {
            return Err(anyhow!(
                "Vision API error ({}): {}",
                status,
                extract_google_error(&text).unwrap_or(text)
            ));
        }
        Ok(text)
    }
}

impl RecognitionGateway for GoogleVision {
    fn recognize(&self, image: Vec<u8>) -> RecognitionFuture {
        let this = self.clone();
        Box::pin(async move {
            let body = this.annotate(&image).await?;
            let extracted = extract_full_text(&body)?;
            debug!("vision: {} chars recognized", extracted.chars().count());
            Ok::<_, RecognitionError>(extracted)
        })
    }
}

pub(crate) fn annotate_request_body(image: &[u8]) -> Value {
    json!({
        "requests": [
            {
                "features": [{ "type": "TEXT_DETECTION" }],
                "image": { "content": BASE64.encode(image) }
            }
        ]
    })
}

/// Reads the first per-image response of an `images:annotate` reply.
///
/// A non-empty `error.message` is the service's verdict on the image and comes
/// back as `Reported`. Otherwise the first text annotation holds the full text;
/// no annotations means no text.
pub(crate) fn extract_full_text(body: &str) -> Result<String, RecognitionError> {
    let payload: AnnotateResponse = serde_json::from_str(body)
        .map_err(|err| anyhow!("failed to parse Vision response JSON: {}", err))?;
    let Some(first) = payload.responses.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(error) = first.error
        && let Some(message) = error.message
        && !message.is_empty()
    {
        return Err(RecognitionError::Reported(message));
    }
    Ok(first
        .text_annotations
        .into_iter()
        .next()
        .map(|annotation| annotation.description.trim().to_string())
        .unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
struct AnnotateImageResponse {
    #[serde(rename = "textAnnotations", default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    message: Option<String>,
}
