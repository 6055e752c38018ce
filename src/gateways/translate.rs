use anyhow::{Context, anyhow};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{GatewayFuture, LanguagePair, TranslationGateway, extract_google_error};
use crate::credentials::Credentials;

pub(crate) const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com";

/// Google Cloud Translation (basic, v2) client.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: reqwest::Client,
    credentials: Credentials,
    endpoint: String,
}

impl GoogleTranslate {
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
}

impl TranslationGateway for GoogleTranslate {
    fn translate(&self, text: String, languages: LanguagePair) -> GatewayFuture {
        let this = self.clone();
        Box::pin(async move {
            let url = format!("{}/language/translate/v2", this.endpoint);
            let request = this
                .credentials
                .authorize(&this.client, this.client.post(&url))
                .await?;
            let response = request
                .json(&translate_request_body(&text, &languages))
                .send()
                .await?;
            let status = response.status();
            let body = response
                .text()
                .await
                .with_context(|| "failed to read Translation response body")?;
            if !status.is_success() {
                return Err(anyhow!(
                    "Translation API error ({}): {}",
                    status,
                    extract_google_error(&body).unwrap_or(body)
                ));
            }
            extract_translation(&body)
        })
    }
}

pub(crate) fn translate_request_body(text: &str, languages: &LanguagePair) -> Value {
    json!({
        // Plain text; the API default ("html") would escape entities in the reply.
        "format": "text",
        "q": text,
        "source": languages.source,
        "target": languages.target
    })
}

pub(crate) fn extract_translation(body: &str) -> anyhow::Result<String> {
    let payload: TranslateResponse = serde_json::from_str(body)
        .map_err(|err| anyhow!("failed to parse Translation response JSON: {}", err))?;
    payload
        .data
        .translations
        .into_iter()
        .next()
        .map(|translation| translation.translated_text)
        .ok_or_else(|| anyhow!("no translation returned from Translation API"))
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}
