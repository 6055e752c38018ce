use anyhow::{Context, Result, anyhow};
use std::path::Path;

pub mod credentials;
pub mod error;
pub mod gateways;
pub mod logging;
pub mod pipeline;
pub mod router;
pub mod script;
mod server;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use credentials::Credentials;
pub use error::OcrError;
pub use gateways::{
    GatewayFuture, GoogleTranslate, GoogleVision, LanguagePair, RecognitionError,
    RecognitionFuture, RecognitionGateway, TranslationGateway,
};
pub use router::{TranslationOutcome, route};
pub use script::ScriptDetector;
pub use server::{OcrResponse, run_server};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub data: Option<String>,
    pub addr: Option<String>,
    pub settings_path: Option<String>,
    pub credentials_path: Option<String>,
}

/// Runs the OCR pipeline once against an image file and returns the JSON body.
pub async fn run(config: Config) -> Result<String> {
    let Some(data) = config.data.as_deref() else {
        return Err(anyhow!("--data is required"));
    };
    let settings = settings::load_settings(config.settings_path.as_deref().map(Path::new))?;
    let credentials = credentials::resolve_credentials(
        &settings,
        config.credentials_path.as_deref().map(Path::new),
    )?;
    let image =
        std::fs::read(data).with_context(|| format!("failed to read image file: {}", data))?;
    let (vision, translate) = gateways::build_gateways(&settings, credentials)?;
    let outcome = pipeline::process_image(
        &vision,
        &translate,
        &settings.script,
        &settings.languages,
        image,
    )
    .await?;
    Ok(serde_json::to_string_pretty(&OcrResponse::from(outcome))?)
}

/// Starts the HTTP server on `config.addr`, or the configured address.
pub async fn serve(config: Config) -> Result<()> {
    let settings = settings::load_settings(config.settings_path.as_deref().map(Path::new))?;
    let credentials = credentials::resolve_credentials(
        &settings,
        config.credentials_path.as_deref().map(Path::new),
    )?;
    let addr = config
        .addr
        .filter(|addr| !addr.trim().is_empty())
        .unwrap_or_else(|| settings.server_addr.clone());
    run_server(settings, credentials, addr).await
}
