use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::credentials::Credentials;
use crate::settings::Settings;

pub(crate) mod translate;
pub(crate) mod vision;

pub use translate::GoogleTranslate;
pub use vision::GoogleVision;

pub type GatewayFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;
pub type RecognitionFuture =
    Pin<Box<dyn Future<Output = std::result::Result<String, RecognitionError>> + Send>>;

/// Why recognition produced no text.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// The service processed the request and reported an error for the image.
    #[error("{0}")]
    Reported(String),
    /// The call itself failed: transport, non-2xx status, unreadable reply.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self {
            source: "si".to_string(),
            target: "en".to_string(),
        }
    }
}

/// Turns image bytes into the best-guess full text of the image.
///
/// An image without any text yields `Ok("")`, not an error.
pub trait RecognitionGateway: Send + Sync {
    fn recognize(&self, image: Vec<u8>) -> RecognitionFuture;
}

pub trait TranslationGateway: Send + Sync {
    fn translate(&self, text: String, languages: LanguagePair) -> GatewayFuture;
}

pub fn build_http_client(settings: &Settings) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if settings.timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(settings.timeout_secs));
    }
    Ok(builder.build()?)
}

pub fn build_gateways(
    settings: &Settings,
    credentials: Credentials,
) -> Result<(GoogleVision, GoogleTranslate)> {
    let client = build_http_client(settings)?;
    let vision = GoogleVision::new(client.clone(), credentials.clone())
        .with_endpoint(settings.vision_endpoint.clone());
    let translate = GoogleTranslate::new(client, credentials)
        .with_endpoint(settings.translate_endpoint.clone());
    Ok((vision, translate))
}

/// Reads the message of a Google API error body (`{"error": {"message", "status", "code"}}`).
pub(crate) fn extract_google_error(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<GoogleError>,
    }

    #[derive(serde::Deserialize)]
    struct GoogleError {
        message: Option<String>,
        status: Option<String>,
        code: Option<i32>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    if let Some(message) = error.message
        && !message.trim().is_empty()
    {
        return Some(message);
    }
    if let Some(status) = error.status
        && !status.trim().is_empty()
    {
        return Some(status);
    }
    error.code.map(|code| format!("code {}", code))
}
